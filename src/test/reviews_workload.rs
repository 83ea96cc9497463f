use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::test::{TestApp, assert_status, ids};

#[tokio::test]
async fn new_review_has_zero_score() {
    let (app, _, employees) = TestApp::with_staff(1);
    let admin = app.login("admin").await;

    let res = app
        .send(
            Method::POST,
            "/api/v1/reviews/",
            &admin,
            json!({"owner": employees[0], "title": "Q3"}),
        )
        .await;
    assert_status!(res, StatusCode::CREATED);
    assert_eq!(res.1["title"], "Q3");
    assert_eq!(res.1["owner"], employees[0]);
    assert_eq!(res.1["score"], 0.0);
    assert_eq!(res.1["requested"], 0);
    assert_eq!(res.1["responsed"], 0);
}

#[tokio::test]
async fn review_creation_is_validated() {
    let (app, _, employees) = TestApp::with_staff(1);
    let admin = app.login("admin").await;

    let missing_owner = app
        .send(Method::POST, "/api/v1/reviews/", &admin, json!({"title": "Q3"}))
        .await;
    assert_status!(missing_owner, StatusCode::BAD_REQUEST);
    assert!(missing_owner.1.get("owner").is_some());

    let unknown_owner = app
        .send(
            Method::POST,
            "/api/v1/reviews/",
            &admin,
            json!({"owner": 9999, "title": "Q3"}),
        )
        .await;
    assert_status!(unknown_owner, StatusCode::BAD_REQUEST);

    let blank_title = app
        .send(
            Method::POST,
            "/api/v1/reviews/",
            &admin,
            json!({"owner": employees[0], "title": "   "}),
        )
        .await;
    assert_status!(blank_title, StatusCode::BAD_REQUEST);
    assert!(blank_title.1.get("title").is_some());

    let listing = app.get("/api/v1/reviews/", &admin).await;
    assert_eq!(listing.1, json!([]));
}

#[tokio::test]
async fn score_is_mean_of_submitted_responses() {
    let (app, admin_id, employees) = TestApp::with_staff(3);
    let review = app.create_review(admin_id, "Q3");
    let invitations = employees
        .iter()
        .map(|&id| app.invite(review, id))
        .collect::<Vec<_>>();
    app.respond(invitations[0], 80, "");
    app.respond(invitations[1], 20, "");
    let admin = app.login("admin").await;

    let res = app
        .get(&format!("/api/v1/reviews/{review}/"), &admin)
        .await;
    assert_status!(res, StatusCode::OK);
    assert_eq!(res.1["score"], 50.0);
    assert_eq!(res.1["requested"], 3);
    assert_eq!(res.1["responsed"], 2);
}

#[tokio::test]
async fn listing_filters_by_owner() {
    let (app, _, employees) = TestApp::with_staff(2);
    let first = app.create_review(employees[0], "A");
    let second = app.create_review(employees[1], "B");
    let third = app.create_review(employees[0], "C");
    let invitation = app.invite(third, employees[1]);
    app.respond(invitation, 90, "");
    let admin = app.login("admin").await;

    let all = app.get("/api/v1/reviews/", &admin).await;
    assert_status!(all, StatusCode::OK);
    assert_eq!(
        ids(&all.1),
        vec![first as i64, second as i64, third as i64]
    );

    let mine = app
        .get(&format!("/api/v1/reviews/?user={}", employees[0]), &admin)
        .await;
    assert_status!(mine, StatusCode::OK);
    assert_eq!(ids(&mine.1), vec![first as i64, third as i64]);
    assert_eq!(mine.1[0]["score"], 0.0);
    assert_eq!(mine.1[1]["score"], 90.0);
    assert_eq!(mine.1[1]["responsed"], 1);

    let nobody = app.get("/api/v1/reviews/?user=9999", &admin).await;
    assert_eq!(nobody.1, json!([]));
}

#[tokio::test]
async fn put_replaces_and_patch_merges() {
    let (app, _, employees) = TestApp::with_staff(2);
    let review = app.create_review(employees[0], "Q3");
    let admin = app.login("admin").await;
    let uri = format!("/api/v1/reviews/{review}/");

    let incomplete = app
        .send(Method::PUT, &uri, &admin, json!({"title": "Q4"}))
        .await;
    assert_status!(incomplete, StatusCode::BAD_REQUEST);

    let replaced = app
        .send(
            Method::PUT,
            &uri,
            &admin,
            json!({"owner": employees[1], "title": "Q4"}),
        )
        .await;
    assert_status!(replaced, StatusCode::OK);
    assert_eq!(replaced.1["owner"], employees[1]);
    assert_eq!(replaced.1["title"], "Q4");

    let patched = app
        .send(Method::PATCH, &uri, &admin, json!({"title": "Q1"}))
        .await;
    assert_status!(patched, StatusCode::OK);
    assert_eq!(patched.1["owner"], employees[1]);
    assert_eq!(patched.1["title"], "Q1");

    let missing = app
        .send(
            Method::PATCH,
            "/api/v1/reviews/9999/",
            &admin,
            json!({"title": "Q1"}),
        )
        .await;
    assert_status!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_review_removes_invitations() {
    let (app, admin_id, employees) = TestApp::with_staff(1);
    let review = app.create_review(admin_id, "Q3");
    let invitation = app.invite(review, employees[0]);
    app.respond(invitation, 40, "meh");
    let admin = app.login("admin").await;
    let employee = app.login("user0").await;

    let res = app
        .request(
            Method::DELETE,
            &format!("/api/v1/reviews/{review}/"),
            Some(&admin),
            None,
        )
        .await;
    assert_status!(res, StatusCode::NO_CONTENT);

    assert!(app.invitations(review).is_empty());
    assert_eq!(app.response_count(), 0);

    let feedback = app.get("/api/v1/feedbacks/", &employee).await;
    assert_eq!(feedback.1, json!([]));

    let gone = app
        .get(&format!("/api/v1/reviews/{review}/"), &admin)
        .await;
    assert_status!(gone, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn candidates_exclude_owner_and_mark_invited() {
    let (app, _, employees) = TestApp::with_staff(4);
    let owner = employees[0];
    let review = app.create_review(owner, "Q3");
    app.invite(review, employees[2]);
    let admin = app.login("admin").await;

    // A deactivated employee is not a candidate either.
    let res = app
        .request(
            Method::DELETE,
            &format!("/api/v1/employees/{}/", employees[3]),
            Some(&admin),
            None,
        )
        .await;
    assert_status!(res, StatusCode::NO_CONTENT);

    let res = app
        .get(&format!("/api/v1/reviews/{review}/:employees"), &admin)
        .await;
    assert_status!(res, StatusCode::OK);
    assert_eq!(ids(&res.1), vec![employees[1] as i64, employees[2] as i64]);
    assert_eq!(res.1[0]["requested"], false);
    assert_eq!(res.1[1]["requested"], true);
    assert_eq!(res.1[1]["username"], "user2");

    let missing = app.get("/api/v1/reviews/9999/:employees", &admin).await;
    assert_status!(missing, StatusCode::NOT_FOUND);

    let unknown_action = app
        .get(&format!("/api/v1/reviews/{review}/:everyone"), &admin)
        .await;
    assert_status!(unknown_action, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_invite_returns_every_invitation() {
    let (app, _, employees) = TestApp::with_staff(3);
    let review = app.create_review(employees[0], "Q3");
    let existing = app.invite(review, employees[1]);
    let admin = app.login("admin").await;

    let res = app
        .send(
            Method::POST,
            &format!("/api/v1/reviews/{review}/:invite"),
            &admin,
            json!({"participants": [employees[2], employees[1]]}),
        )
        .await;
    assert_status!(res, StatusCode::CREATED);

    let invitations = res.1.as_array().unwrap();
    assert_eq!(invitations.len(), 3);
    assert_eq!(invitations[0]["id"], existing);
    assert_eq!(invitations[1]["owner"], employees[2]);
    assert_eq!(invitations[2]["owner"], employees[1]);
    assert!(invitations.iter().all(|i| i["review"] == review));

    let stats = app
        .get(&format!("/api/v1/reviews/{review}/"), &admin)
        .await;
    assert_eq!(stats.1["requested"], 3);
}

#[tokio::test]
async fn batch_invite_is_all_or_nothing() {
    let (app, _, employees) = TestApp::with_staff(2);
    let review = app.create_review(employees[0], "Q3");
    let admin = app.login("admin").await;

    let res = app
        .send(
            Method::POST,
            &format!("/api/v1/reviews/{review}/:invite"),
            &admin,
            json!({"participants": [employees[1], 9999]}),
        )
        .await;
    assert_status!(res, StatusCode::BAD_REQUEST);
    assert!(res.1.get("participants").is_some());
    assert!(app.invitations(review).is_empty());

    let missing_review = app
        .send(
            Method::POST,
            "/api/v1/reviews/9999/:invite",
            &admin,
            json!({"participants": [employees[1]]}),
        )
        .await;
    assert_status!(missing_review, StatusCode::NOT_FOUND);

    let employee = app.login("user1").await;
    let forbidden = app
        .send(
            Method::POST,
            &format!("/api/v1/reviews/{review}/:invite"),
            &employee,
            json!({"participants": [employees[1]]}),
        )
        .await;
    assert_status!(forbidden, StatusCode::FORBIDDEN);
    assert!(app.invitations(review).is_empty());
}
