use axum::{Json, http::StatusCode};
use diesel::prelude::*;
use serde::Deserialize;

use crate::{
    accounts::user_exists,
    permission::Admin,
    reviews::{Review, ReviewView, aggregate::ReviewStats},
    schema::reviews,
    state::Conn,
    util_resp::{
        JsonBody, PathParam, QueryParams, StandardResponse, invalid,
    },
    validation::is_valid_title,
};

fn check_owner(owner: i32, conn: &mut SqliteConnection) -> StandardResponse<()> {
    if user_exists(owner, conn)? {
        Ok(())
    } else {
        Err(invalid(
            "owner",
            format!("Invalid pk \"{owner}\" - object does not exist."),
        ))
    }
}

pub fn create_review(
    owner: i32,
    title: &str,
    conn: &mut SqliteConnection,
) -> StandardResponse<Review> {
    is_valid_title(title).map_err(|e| invalid("title", e))?;
    check_owner(owner, conn)?;

    let review = diesel::insert_into(reviews::table)
        .values((reviews::owner_id.eq(owner), reviews::title.eq(title)))
        .returning(Review::as_returning())
        .get_result(conn)?;

    tracing::info!(review_id = review.id, owner_id = owner, "created review");
    Ok(review)
}

pub fn list_reviews(
    owner: Option<i32>,
    conn: &mut SqliteConnection,
) -> StandardResponse<Vec<ReviewView>> {
    let mut query = reviews::table
        .order_by(reviews::id.asc())
        .select(Review::as_select())
        .into_boxed();
    if let Some(owner) = owner {
        query = query.filter(reviews::owner_id.eq(owner));
    }
    let reviews = query.load::<Review>(conn)?;

    let ids = reviews.iter().map(|r| r.id).collect::<Vec<_>>();
    let stats = ReviewStats::of_reviews(&ids, conn)?;

    Ok(reviews
        .iter()
        .map(|review| {
            ReviewView::new(
                review,
                stats.get(&review.id).copied().unwrap_or_default(),
            )
        })
        .collect())
}

#[derive(AsChangeset)]
#[diesel(table_name = reviews)]
struct ReviewChangeset<'a> {
    owner_id: Option<i32>,
    title: Option<&'a str>,
}

/// Applies `changes` to a review. Unless `partial` is set, both fields must
/// be supplied.
pub fn update_review(
    id: i32,
    changes: &ReviewForm,
    partial: bool,
    conn: &mut SqliteConnection,
) -> StandardResponse<Review> {
    let review = Review::fetch(id, conn)?;

    if !partial {
        if changes.owner.is_none() {
            return Err(invalid("owner", "This field is required."));
        }
        if changes.title.is_none() {
            return Err(invalid("title", "This field is required."));
        }
    }
    if let Some(title) = &changes.title {
        is_valid_title(title).map_err(|e| invalid("title", e))?;
    }
    if let Some(owner) = changes.owner {
        check_owner(owner, conn)?;
    }

    let changeset = ReviewChangeset {
        owner_id: changes.owner,
        title: changes.title.as_deref(),
    };
    if changeset.owner_id.is_none() && changeset.title.is_none() {
        return Ok(review);
    }

    let review = diesel::update(&review)
        .set(&changeset)
        .returning(Review::as_returning())
        .get_result(conn)?;

    tracing::info!(review_id = review.id, "updated review");
    Ok(review)
}

/// Hard delete. Invitations and responses go with it.
pub fn delete_review(
    id: i32,
    conn: &mut SqliteConnection,
) -> StandardResponse<()> {
    let review = Review::fetch(id, conn)?;
    diesel::delete(&review).execute(conn)?;

    tracing::info!(review_id = review.id, "deleted review");
    Ok(())
}

#[derive(Deserialize)]
pub struct ReviewListQuery {
    user: Option<i32>,
}

pub async fn list_reviews_page(
    _admin: Admin,
    QueryParams(query): QueryParams<ReviewListQuery>,
    conn: Conn,
) -> StandardResponse<Json<Vec<ReviewView>>> {
    let reviews = conn.run(move |conn| list_reviews(query.user, conn)).await?;
    Ok(Json(reviews))
}

#[derive(Deserialize)]
pub struct ReviewForm {
    pub owner: Option<i32>,
    pub title: Option<String>,
}

pub async fn do_create_review(
    _admin: Admin,
    conn: Conn,
    JsonBody(form): JsonBody<ReviewForm>,
) -> StandardResponse<(StatusCode, Json<ReviewView>)> {
    let owner = form
        .owner
        .ok_or_else(|| invalid("owner", "This field is required."))?;
    let title = form
        .title
        .ok_or_else(|| invalid("title", "This field is required."))?;

    let view = conn
        .run(move |conn| {
            let review = create_review(owner, &title, conn)?;
            ReviewView::load(&review, conn)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn retrieve_review(
    _admin: Admin,
    PathParam(id): PathParam<i32>,
    conn: Conn,
) -> StandardResponse<Json<ReviewView>> {
    let view = conn
        .run(move |conn| {
            let review = Review::fetch(id, conn)?;
            ReviewView::load(&review, conn)
        })
        .await?;
    Ok(Json(view))
}

async fn edit_review(
    id: i32,
    form: ReviewForm,
    partial: bool,
    conn: Conn,
) -> StandardResponse<Json<ReviewView>> {
    let view = conn
        .run(move |conn| {
            let review = update_review(id, &form, partial, conn)?;
            ReviewView::load(&review, conn)
        })
        .await?;
    Ok(Json(view))
}

pub async fn replace_review(
    _admin: Admin,
    PathParam(id): PathParam<i32>,
    conn: Conn,
    JsonBody(form): JsonBody<ReviewForm>,
) -> StandardResponse<Json<ReviewView>> {
    edit_review(id, form, false, conn).await
}

pub async fn patch_review(
    _admin: Admin,
    PathParam(id): PathParam<i32>,
    conn: Conn,
    JsonBody(form): JsonBody<ReviewForm>,
) -> StandardResponse<Json<ReviewView>> {
    edit_review(id, form, true, conn).await
}

pub async fn do_delete_review(
    _admin: Admin,
    PathParam(id): PathParam<i32>,
    conn: Conn,
) -> StandardResponse<StatusCode> {
    conn.run(move |conn| delete_review(id, conn)).await?;
    Ok(StatusCode::NO_CONTENT)
}
