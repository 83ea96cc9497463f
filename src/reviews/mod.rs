use diesel::prelude::*;
use serde::Serialize;

use crate::{
    reviews::aggregate::ReviewStats,
    schema::reviews,
    util_resp::{StandardResponse, not_found},
};

pub mod aggregate;
pub mod invite;
pub mod manage;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = reviews)]
pub struct Review {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
}

impl Review {
    pub fn fetch(
        id: i32,
        conn: &mut SqliteConnection,
    ) -> StandardResponse<Review> {
        reviews::table
            .find(id)
            .select(Review::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(not_found)
    }
}

/// A review as the admin endpoints return it: the stored columns plus the
/// derived aggregate fields.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReviewView {
    pub id: i32,
    pub title: String,
    pub owner: i32,
    pub score: f64,
    pub requested: i64,
    pub responsed: i64,
}

impl ReviewView {
    pub fn new(review: &Review, stats: ReviewStats) -> Self {
        ReviewView {
            id: review.id,
            title: review.title.clone(),
            owner: review.owner_id,
            score: stats.score,
            requested: stats.requested,
            responsed: stats.responsed,
        }
    }

    pub fn load(
        review: &Review,
        conn: &mut SqliteConnection,
    ) -> StandardResponse<Self> {
        let stats = ReviewStats::of_review(review.id, conn)?;
        Ok(ReviewView::new(review, stats))
    }
}
