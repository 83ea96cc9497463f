use axum::{
    Router,
    routing::{get, patch, post},
};
use clap::Parser;
use tower_http::trace::TraceLayer;

use crate::{
    accounts::manage::{
        create_employee, delete_employee, list_employees, retrieve_employee,
        retrieve_self, update_employee,
    },
    auth::login::create_token,
    feedback::submit::{list_feedback, patch_feedback, replace_feedback},
    reviews::{
        invite::{do_invite, list_candidates},
        manage::{
            do_create_review, do_delete_review, list_reviews_page,
            patch_review, replace_review, retrieve_review,
        },
    },
    state::{DbPool, IN_MEMORY, make_pool},
};

#[derive(Parser, Debug, Clone)]
#[command(about = "Peer review API server")]
pub struct Config {
    /// SQLite database to use. Defaults to a throwaway in-memory database.
    #[arg(long, env = "DATABASE_URL", default_value = IN_MEMORY)]
    pub database_url: String,
    /// Address the HTTP server listens on.
    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1:8000")]
    pub bind: String,
    /// Maximum number of pooled connections (always 1 for `:memory:`).
    #[arg(long, env = "POOL_SIZE", default_value_t = 10)]
    pub pool_size: u32,
}

impl Config {
    pub fn make_pool(&self) -> Result<DbPool, diesel::r2d2::PoolError> {
        make_pool(&self.database_url, self.pool_size)
    }
}

// Segments such as `:self` and `:invite` are literal, but axum reads a
// leading `:` as a capture. They are captured as `:id`/`:action` and matched
// exactly by the handlers.
pub fn create_app(pool: DbPool) -> Router {
    Router::new()
        .route("/api/v1/tokens/", post(create_token))
        .route(
            "/api/v1/employees/",
            get(list_employees).post(create_employee),
        )
        .route(
            "/api/v1/employees/:id/",
            get(retrieve_employee)
                .put(update_employee)
                .patch(update_employee)
                .delete(delete_employee),
        )
        .route("/api/v1/employees/:id", get(retrieve_self))
        .route(
            "/api/v1/reviews/",
            get(list_reviews_page).post(do_create_review),
        )
        .route(
            "/api/v1/reviews/:id/",
            get(retrieve_review)
                .put(replace_review)
                .patch(patch_review)
                .delete(do_delete_review),
        )
        .route(
            "/api/v1/reviews/:id/:action",
            get(list_candidates).post(do_invite),
        )
        .route("/api/v1/feedbacks/", get(list_feedback))
        .route(
            "/api/v1/feedbacks/:id/",
            patch(patch_feedback).put(replace_feedback),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(pool)
}
