//! End-to-end workloads. Each test drives the real router in-process against
//! its own database: in-memory unless the workload needs several
//! connections.

use std::path::PathBuf;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::AUTHORIZATION},
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    accounts::create_user,
    config::create_app,
    feedback::Invitation,
    schema::{review_requests, review_responses, reviews},
    state::{DbPool, IN_MEMORY, make_pool, run_migrations},
};
use diesel::prelude::*;

mod reviews_workload;

pub const PASSWORD: &str = "1234";

// A macro rather than a function so that a failing assertion points at the
// call site.
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.0, $status,
            "unexpected status, body = {}",
            $response.1
        );
    };
}
pub(crate) use assert_status;

pub struct TestApp {
    pub app: Router,
    pub pool: DbPool,
    file: Option<PathBuf>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            for suffix in ["", "-wal", "-shm"] {
                let mut path = file.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_pool(make_pool(IN_MEMORY, 1).unwrap(), None)
    }

    /// A fresh database file in the temporary directory, shared by
    /// `pool_size` connections. Removed again when the app is dropped.
    pub fn on_disk(pool_size: u32) -> Self {
        let file = std::env::temp_dir().join(format!(
            "peerreview-{}-{:016x}.sqlite3",
            std::process::id(),
            rand::random::<u64>()
        ));
        let pool = make_pool(file.to_str().unwrap(), pool_size).unwrap();
        Self::with_pool(pool, Some(file))
    }

    fn with_pool(pool: DbPool, file: Option<PathBuf>) -> Self {
        {
            let mut conn = pool.get().unwrap();
            run_migrations(&mut conn).unwrap();
        }

        TestApp {
            app: create_app(pool.clone()),
            pool,
            file,
        }
    }

    /// The fixture most workloads start from: `admin` followed by
    /// `user0..user{n-1}`. Returns the employee ids in order.
    pub fn with_staff(employees: usize) -> (Self, i32, Vec<i32>) {
        let app = TestApp::new();
        let admin = app.create_user(true, "admin");
        let ids = (0..employees)
            .map(|i| app.create_user(false, &format!("user{i}")))
            .collect();
        (app, admin, ids)
    }

    pub fn create_user(&self, is_admin: bool, username: &str) -> i32 {
        let mut conn = self.pool.get().unwrap();
        create_user(is_admin, username, PASSWORD, "", &mut conn)
            .unwrap()
            .id()
    }

    pub fn create_review(&self, owner: i32, title: &str) -> i32 {
        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(reviews::table)
            .values((reviews::owner_id.eq(owner), reviews::title.eq(title)))
            .returning(reviews::id)
            .get_result(&mut conn)
            .unwrap()
    }

    pub fn invite(&self, review: i32, owner: i32) -> i32 {
        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(review_requests::table)
            .values((
                review_requests::review_id.eq(review),
                review_requests::owner_id.eq(owner),
            ))
            .returning(review_requests::id)
            .get_result(&mut conn)
            .unwrap()
    }

    pub fn respond(&self, invitation: i32, score: i32, memo: &str) {
        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(review_responses::table)
            .values((
                review_responses::request_id.eq(invitation),
                review_responses::score.eq(score),
                review_responses::memo.eq(memo),
            ))
            .execute(&mut conn)
            .unwrap();
    }

    pub fn invitations(&self, review: i32) -> Vec<Invitation> {
        let mut conn = self.pool.get().unwrap();
        Invitation::of_review(review, &mut conn).unwrap()
    }

    pub fn response_count(&self) -> i64 {
        let mut conn = self.pool.get().unwrap();
        review_responses::table
            .count()
            .get_result(&mut conn)
            .unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Token {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(method, uri, Some(token), Some(body)).await
    }

    pub async fn login(&self, username: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/tokens/",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_status!(response, StatusCode::OK);

        response.1["token"].as_str().unwrap().to_string()
    }
}

/// Ids of the JSON objects in an array response, in order.
pub fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}
