pub mod submit;

use std::collections::HashMap;

use diesel::prelude::*;
use serde::Serialize;

use crate::{
    accounts::UserView,
    reviews::Review,
    schema::{review_requests, review_responses, reviews},
    util_resp::{FailureResponse, StandardResponse},
};

/// One employee asked to review one review. The same employee may be
/// invited to the same review more than once.
#[derive(
    Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize,
)]
#[diesel(table_name = review_requests)]
pub struct Invitation {
    pub id: i32,
    #[serde(rename = "review")]
    pub review_id: i32,
    #[serde(rename = "owner")]
    pub owner_id: i32,
}

impl Invitation {
    pub fn of_review(
        review_id: i32,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Vec<Invitation>> {
        review_requests::table
            .filter(review_requests::review_id.eq(review_id))
            .order_by(review_requests::id.asc())
            .select(Invitation::as_select())
            .load(conn)
    }
}

#[derive(
    Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize,
)]
#[diesel(table_name = review_responses)]
pub struct ReviewResponse {
    pub id: i32,
    #[serde(rename = "request")]
    pub request_id: i32,
    pub score: i32,
    pub memo: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReviewBrief {
    pub id: i32,
    pub title: String,
    pub owner: UserView,
}

/// An invitation as its invitee sees it: the review it belongs to, both
/// parties, and the current response if one has been submitted.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InvitationDetail {
    pub id: i32,
    pub review: ReviewBrief,
    pub owner: UserView,
    #[serde(rename = "reviewresponse")]
    pub response: Option<ReviewResponse>,
}

type DetailRow = (Invitation, Review, Option<ReviewResponse>);

impl InvitationDetail {
    pub fn of_owner(
        owner_id: i32,
        conn: &mut SqliteConnection,
    ) -> StandardResponse<Vec<InvitationDetail>> {
        let rows = review_requests::table
            .inner_join(reviews::table)
            .left_join(review_responses::table)
            .filter(review_requests::owner_id.eq(owner_id))
            .order_by(review_requests::id.asc())
            .select((
                Invitation::as_select(),
                Review::as_select(),
                Option::<ReviewResponse>::as_select(),
            ))
            .load::<DetailRow>(conn)?;

        Self::assemble(rows, conn)
    }

    pub fn of_invitation(
        invitation_id: i32,
        conn: &mut SqliteConnection,
    ) -> StandardResponse<InvitationDetail> {
        let row = review_requests::table
            .inner_join(reviews::table)
            .left_join(review_responses::table)
            .filter(review_requests::id.eq(invitation_id))
            .select((
                Invitation::as_select(),
                Review::as_select(),
                Option::<ReviewResponse>::as_select(),
            ))
            .first::<DetailRow>(conn)?;

        Self::assemble(vec![row], conn)?.pop().ok_or_else(|| {
            FailureResponse::Internal(format!(
                "invitation {invitation_id} vanished while loading"
            ))
        })
    }

    fn assemble(
        rows: Vec<DetailRow>,
        conn: &mut SqliteConnection,
    ) -> StandardResponse<Vec<InvitationDetail>> {
        let mut user_ids = rows
            .iter()
            .flat_map(|(invitation, review, _)| {
                [invitation.owner_id, review.owner_id]
            })
            .collect::<Vec<_>>();
        user_ids.sort_unstable();
        user_ids.dedup();

        let users: HashMap<i32, UserView> = UserView::load_map(&user_ids, conn)?;
        let user = |id: i32| {
            users.get(&id).cloned().ok_or_else(|| {
                FailureResponse::Internal(format!("user {id} has no account"))
            })
        };

        rows.into_iter()
            .map(|(invitation, review, response)| {
                Ok(InvitationDetail {
                    id: invitation.id,
                    review: ReviewBrief {
                        id: review.id,
                        title: review.title,
                        owner: user(review.owner_id)?,
                    },
                    owner: user(invitation.owner_id)?,
                    response,
                })
            })
            .collect()
    }
}
