//! Derived review figures. Nothing here is stored: every read recomputes
//! from the current invitation and response rows.

use std::collections::HashMap;

use diesel::{
    connection::LoadConnection, dsl::count_star, prelude::*, sqlite::Sqlite,
};
use serde::Serialize;

use crate::schema::{review_requests, review_responses};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct ReviewStats {
    /// Mean of the submitted scores, or `0` when there are none. A zero
    /// score with `responsed == 0` therefore means "no data".
    pub score: f64,
    /// Number of invitations sent for the review.
    pub requested: i64,
    /// Number of invitations that have a response.
    pub responsed: i64,
}

pub fn mean_score(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: i64 = scores.iter().map(|&s| s as i64).sum();
    sum as f64 / scores.len() as f64
}

impl ReviewStats {
    pub fn from_scores(requested: i64, scores: &[i32]) -> Self {
        ReviewStats {
            score: mean_score(scores),
            requested,
            responsed: scores.len() as i64,
        }
    }

    pub fn of_review(
        review_id: i32,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<ReviewStats> {
        let mut stats = Self::of_reviews(&[review_id], conn)?;
        Ok(stats.remove(&review_id).unwrap_or_default())
    }

    /// Computes the figures for a batch of reviews with two queries,
    /// regardless of how many reviews are asked for.
    pub fn of_reviews(
        review_ids: &[i32],
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<i32, ReviewStats>> {
        let requested: HashMap<i32, i64> = review_requests::table
            .filter(review_requests::review_id.eq_any(review_ids))
            .group_by(review_requests::review_id)
            .select((review_requests::review_id, count_star()))
            .load::<(i32, i64)>(conn)?
            .into_iter()
            .collect();

        let mut scores: HashMap<i32, Vec<i32>> = HashMap::new();
        for (review_id, score) in review_responses::table
            .inner_join(review_requests::table)
            .filter(review_requests::review_id.eq_any(review_ids))
            .select((review_requests::review_id, review_responses::score))
            .load::<(i32, i32)>(conn)?
        {
            scores.entry(review_id).or_default().push(score);
        }

        Ok(review_ids
            .iter()
            .map(|id| {
                let stats = ReviewStats::from_scores(
                    requested.get(id).copied().unwrap_or(0),
                    scores.get(id).map(Vec::as_slice).unwrap_or(&[]),
                );
                (*id, stats)
            })
            .collect())
    }
}
