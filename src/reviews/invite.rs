use std::collections::HashSet;

use axum::{Json, http::StatusCode};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    accounts::{ActiveEmployees, UserView, user_exists},
    feedback::Invitation,
    permission::Admin,
    reviews::Review,
    schema::review_requests,
    state::Conn,
    util_resp::{
        FailureResponse, JsonBody, PathParam, StandardResponse, invalid,
        not_found,
    },
};

pub const EMPLOYEES_ACTION: &str = ":employees";
pub const INVITE_ACTION: &str = ":invite";

/// Invites every participant to the review in one transaction and returns
/// all of the review's invitations, old and new.
///
/// The only check on a participant is that the user exists; an unknown id
/// aborts the whole batch. Inviting someone who already has an invitation
/// creates a second one.
pub fn batch_invite(
    review_id: i32,
    participants: &[i32],
    conn: &mut SqliteConnection,
) -> StandardResponse<Vec<Invitation>> {
    conn.immediate_transaction::<_, FailureResponse, _>(|conn| {
        let review = Review::fetch(review_id, conn)?;

        for &participant in participants {
            if !user_exists(participant, conn)? {
                return Err(invalid(
                    "participants",
                    format!(
                        "Invalid pk \"{participant}\" - object does not exist."
                    ),
                ));
            }

            diesel::insert_into(review_requests::table)
                .values((
                    review_requests::review_id.eq(review.id),
                    review_requests::owner_id.eq(participant),
                ))
                .execute(conn)?;
        }

        tracing::info!(
            review_id = review.id,
            invited = participants.len(),
            "sent review invitations"
        );

        Ok(Invitation::of_review(review.id, conn)?)
    })
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Candidate {
    #[serde(flatten)]
    pub user: UserView,
    /// Whether the employee already has an invitation for this review.
    pub requested: bool,
}

/// Everyone who could review `review_id`: active employees other than the
/// review's owner.
pub fn candidates(
    review_id: i32,
    conn: &mut SqliteConnection,
) -> StandardResponse<Vec<Candidate>> {
    let review = Review::fetch(review_id, conn)?;

    let invited: HashSet<i32> = review_requests::table
        .filter(review_requests::review_id.eq(review.id))
        .select(review_requests::owner_id)
        .load::<i32>(conn)?
        .into_iter()
        .collect();

    Ok(ActiveEmployees::load(conn)?
        .iter()
        .filter(|account| account.id() != review.owner_id)
        .map(|account| Candidate {
            user: UserView::from(account),
            requested: invited.contains(&account.id()),
        })
        .collect())
}

pub async fn list_candidates(
    _admin: Admin,
    PathParam((id, action)): PathParam<(i32, String)>,
    conn: Conn,
) -> StandardResponse<Json<Vec<Candidate>>> {
    if action != EMPLOYEES_ACTION {
        return Err(not_found());
    }

    Ok(Json(conn.run(move |conn| candidates(id, conn)).await?))
}

#[derive(Deserialize)]
pub struct InviteForm {
    participants: Vec<i32>,
}

pub async fn do_invite(
    _admin: Admin,
    PathParam((id, action)): PathParam<(i32, String)>,
    conn: Conn,
    JsonBody(form): JsonBody<InviteForm>,
) -> StandardResponse<(StatusCode, Json<Vec<Invitation>>)> {
    if action != INVITE_ACTION {
        return Err(not_found());
    }

    let invitations = conn
        .run(move |conn| batch_invite(id, &form.participants, conn))
        .await?;
    Ok((StatusCode::CREATED, Json(invitations)))
}
