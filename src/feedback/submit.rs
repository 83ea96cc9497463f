use axum::Json;
use diesel::{prelude::*, upsert::excluded};
use serde::Deserialize;

use crate::{
    auth::Principal,
    feedback::{Invitation, InvitationDetail, ReviewResponse},
    schema::{review_requests, review_responses},
    state::Conn,
    util_resp::{
        FailureResponse, JsonBody, PathParam, StandardResponse, invalid,
        not_found,
    },
};

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

pub fn validate_score(score: i64) -> StandardResponse<i32> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score as i32)
    } else {
        Err(invalid(
            "score",
            format!(
                "Ensure this value is between {MIN_SCORE} and {MAX_SCORE}."
            ),
        ))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ResponseForm {
    pub score: Option<i64>,
    pub memo: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = review_responses)]
struct ResponseChangeset<'a> {
    score: Option<i32>,
    memo: Option<&'a str>,
}

/// Records the caller's response to one of their own invitations.
///
/// The first submission creates the response and must carry a score. Later
/// submissions update the same row; with `partial` set, fields missing from
/// the form keep their current values. Everything is validated before the
/// first write.
pub fn submit_response(
    principal: &Principal,
    invitation_id: i32,
    form: &ResponseForm,
    partial: bool,
    conn: &mut SqliteConnection,
) -> StandardResponse<InvitationDetail> {
    let score = form.score.map(validate_score).transpose()?;
    let memo = form.memo.as_deref();

    if !partial {
        if score.is_none() {
            return Err(invalid("score", "This field is required."));
        }
        if memo.is_none() {
            return Err(invalid("memo", "This field is required."));
        }
    }

    conn.immediate_transaction::<_, FailureResponse, _>(|conn| {
        // Someone else's invitation looks exactly like a missing one.
        let invitation = review_requests::table
            .find(invitation_id)
            .filter(review_requests::owner_id.eq(principal.id()))
            .select(Invitation::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(not_found)?;

        let existing = review_responses::table
            .filter(review_responses::request_id.eq(invitation.id))
            .select(ReviewResponse::as_select())
            .first(conn)
            .optional()?;

        match existing {
            Some(response) => {
                if score.is_some() || memo.is_some() {
                    diesel::update(&response)
                        .set(&ResponseChangeset { score, memo })
                        .execute(conn)?;
                }
                tracing::info!(
                    invitation_id = invitation.id,
                    response_id = response.id,
                    "updated review response"
                );
            }
            None => {
                let score = score.ok_or_else(|| {
                    invalid("score", "This field is required.")
                })?;
                // A concurrent first submission may have won the race; the
                // later writer then overwrites it.
                diesel::insert_into(review_responses::table)
                    .values((
                        review_responses::request_id.eq(invitation.id),
                        review_responses::score.eq(score),
                        review_responses::memo.eq(memo.unwrap_or_default()),
                    ))
                    .on_conflict(review_responses::request_id)
                    .do_update()
                    .set((
                        review_responses::score
                            .eq(excluded(review_responses::score)),
                        review_responses::memo
                            .eq(excluded(review_responses::memo)),
                    ))
                    .execute(conn)?;
                tracing::info!(
                    invitation_id = invitation.id,
                    "created review response"
                );
            }
        }

        InvitationDetail::of_invitation(invitation.id, conn)
    })
}

pub async fn list_feedback(
    principal: Principal,
    conn: Conn,
) -> StandardResponse<Json<Vec<InvitationDetail>>> {
    let owner = principal.id();
    let invitations = conn
        .run(move |conn| InvitationDetail::of_owner(owner, conn))
        .await?;
    Ok(Json(invitations))
}

pub async fn patch_feedback(
    principal: Principal,
    PathParam(id): PathParam<i32>,
    conn: Conn,
    JsonBody(form): JsonBody<ResponseForm>,
) -> StandardResponse<Json<InvitationDetail>> {
    let detail = conn
        .run(move |conn| submit_response(&principal, id, &form, true, conn))
        .await?;
    Ok(Json(detail))
}

pub async fn replace_feedback(
    principal: Principal,
    PathParam(id): PathParam<i32>,
    conn: Conn,
    JsonBody(form): JsonBody<ResponseForm>,
) -> StandardResponse<Json<InvitationDetail>> {
    let detail = conn
        .run(move |conn| submit_response(&principal, id, &form, false, conn))
        .await?;
    Ok(Json(detail))
}
