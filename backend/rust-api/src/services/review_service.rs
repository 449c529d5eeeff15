use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use mongodb::bson::doc;
use mongodb::Database;

use crate::metrics::REVIEW_PROMPTS_GRANTED_TOTAL;
use crate::models::profile::Profile;
use crate::utils::time::chrono_to_bson;

/// Openings recorded before a review prompt is considered.
const MIN_APP_OPENINGS: usize = 3;
/// Correct attempts recorded before a review prompt is considered.
const MIN_CORRECT_SOLVES: u64 = 20;
/// Days between prompts.
const REVIEW_COOLDOWN_DAYS: i64 = 7;
/// Only the most recent openings are kept on the profile.
const MAX_TRACKED_OPENINGS: i64 = 100;

pub struct ReviewService {
    mongo: Database,
}

impl ReviewService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Record one app opening on the profile, keeping the last 100.
    pub async fn log_opening(&self, user_id: &str) -> Result<()> {
        let now_ms = Utc::now().timestamp_millis();

        let result = self
            .mongo
            .collection::<Profile>("profiles")
            .update_one(
                doc! { "_id": user_id },
                doc! { "$push": {
                    "app_openings": { "$each": [now_ms], "$slice": -MAX_TRACKED_OPENINGS }
                } },
            )
            .await
            .context("Failed to record app opening")?;

        if result.matched_count == 0 {
            tracing::warn!("No profile to record opening for user {}", user_id);
        }

        Ok(())
    }

    /// Decide whether the client should ask for a store review now. A grant
    /// records the request time, so asking again inside the cooldown window
    /// is refused.
    pub async fn maybe_request_review(&self, user_id: &str) -> Result<bool> {
        let profiles = self.mongo.collection::<Profile>("profiles");

        let profile = match profiles
            .find_one(doc! { "_id": user_id })
            .await
            .context("Failed to load profile for review check")?
        {
            Some(profile) => profile,
            None => return Ok(false),
        };

        let wins = self
            .mongo
            .collection::<mongodb::bson::Document>("puzzle_attempts")
            .count_documents(doc! { "user_id": user_id, "outcome": "correct" })
            .await
            .context("Failed to count correct attempts")?;

        let now = Utc::now();
        if !review_due(
            profile.app_openings.len(),
            wins,
            profile.last_review_request,
            now,
        ) {
            return Ok(false);
        }

        profiles
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "last_review_request": chrono_to_bson(now) } },
            )
            .await
            .context("Failed to record review request")?;

        REVIEW_PROMPTS_GRANTED_TOTAL.inc();
        tracing::info!("Review prompt granted for user {}", user_id);

        Ok(true)
    }
}

/// The prompt conditions: enough openings, enough wins, and not asked within
/// the last week.
pub fn review_due(
    openings: usize,
    correct_solves: u64,
    last_request: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let has_minimum_openings = openings >= MIN_APP_OPENINGS;
    let has_enough_solves = correct_solves >= MIN_CORRECT_SOLVES;
    let not_asked_recently =
        last_request.map_or(true, |at| now - at > Duration::days(REVIEW_COOLDOWN_DAYS));

    has_minimum_openings && has_enough_solves && not_asked_recently
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_conditions_must_hold() {
        let now = Utc::now();

        assert!(review_due(3, 20, None, now));
        assert!(!review_due(2, 20, None, now));
        assert!(!review_due(3, 19, None, now));
    }

    #[test]
    fn cooldown_blocks_reprompting() {
        let now = Utc::now();

        let three_days_ago = now - Duration::days(3);
        assert!(!review_due(10, 100, Some(three_days_ago), now));

        let eight_days_ago = now - Duration::days(8);
        assert!(review_due(10, 100, Some(eight_days_ago), now));
    }
}
