use anyhow::Result;
use chrono::Utc;
use mongodb::Database;
use uuid::Uuid;

use crate::metrics::{ATTEMPTS_SUBMITTED_TOTAL, DAILY_CHALLENGES_COMPLETED_TOTAL};
use crate::models::attempt::{
    AttemptOutcome, AttemptRecord, DailyChallengeStatus, SubmitAttemptRequest,
    SubmitAttemptResponse,
};
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::time::day_key;

use super::profile_service::ProfileService;
use super::puzzle_catalog::{MongoPuzzleCatalog, PuzzleCatalog};
use super::{progression, rating};

pub struct AttemptService {
    mongo: Database,
}

impl AttemptService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// The explicit record-attempt command: applies the rating update and
    /// progression bookkeeping, persists the profile snapshot, and appends
    /// one row to the attempt log. The log write runs in the background;
    /// rating and progression are already committed by the time it lands.
    pub async fn submit_attempt(
        &self,
        user_id: &str,
        puzzle_id: &str,
        req: &SubmitAttemptRequest,
    ) -> Result<SubmitAttemptResponse> {
        tracing::info!(
            "Processing attempt: user={}, puzzle={}, outcome={}, hint={}, solution={}",
            user_id,
            puzzle_id,
            req.outcome.as_str(),
            req.used_hint,
            req.used_solution
        );

        let catalog = MongoPuzzleCatalog::new(self.mongo.clone());
        let puzzle = catalog
            .find_by_id(puzzle_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Puzzle not found"))?;
        let puzzle_rating = puzzle.rating_or_default();

        let profile_service = ProfileService::new(self.mongo.clone());
        let mut profile = profile_service.load_or_create(user_id).await?;

        let aided = req.aided();
        let rating_before = profile.rating;
        let rating_after =
            rating::rating_after_attempt(rating_before, puzzle_rating, req.outcome, aided);
        profile.rating = rating_after;

        let today = day_key(Utc::now());
        let progress = progression::apply_attempt(&mut profile, req.outcome, aided, &today);

        if req.outcome != AttemptOutcome::Skipped {
            profile.record_solve_time(req.time_to_solve_ms);
        }

        profile_service.save(&mut profile).await?;

        let record = AttemptRecord {
            id: Uuid::new_v4().to_string(),
            puzzle_id: puzzle_id.to_string(),
            user_id: user_id.to_string(),
            rating_before,
            rating_after,
            outcome: req.outcome,
            used_hint: req.used_hint,
            used_solution: req.used_solution,
            time_to_solve_ms: req.time_to_solve_ms,
            created_at: Utc::now(),
        };
        self.log_attempt(record);

        let aided_label = if aided { "true" } else { "false" };
        ATTEMPTS_SUBMITTED_TOTAL
            .with_label_values(&[req.outcome.as_str(), aided_label])
            .inc();
        if progress.challenge_completed_now {
            DAILY_CHALLENGES_COMPLETED_TOTAL.inc();
        }

        tracing::info!(
            "Attempt processed: user={}, rating {} -> {}, streak={}, daily={}/{}",
            user_id,
            rating_before,
            rating_after,
            profile.current_streak,
            profile.daily_count,
            progression::DAILY_CHALLENGE_GOAL
        );

        Ok(SubmitAttemptResponse {
            outcome: req.outcome,
            rating_before,
            rating_after,
            rating_change: rating_after - rating_before,
            current_streak: profile.current_streak,
            highest_streak: profile.highest_streak,
            daily_challenge: DailyChallengeStatus {
                count: profile.daily_count,
                goal: progression::DAILY_CHALLENGE_GOAL,
                completed_today: profile.last_day_completed.as_deref() == Some(today.as_str()),
                day_streak: profile.day_streak,
            },
            level_up: progress.level_up,
            feedback: match req.outcome {
                AttemptOutcome::Correct => Some("Correct!".to_string()),
                AttemptOutcome::Incorrect => Some("Incorrect!".to_string()),
                AttemptOutcome::Skipped => None,
            },
        })
    }

    /// Append the attempt row in the background. A failed insert is a
    /// diagnostics-only event; the caller has already been answered.
    fn log_attempt(&self, record: AttemptRecord) {
        let mongo = self.mongo.clone();

        tokio::spawn(async move {
            let collection: mongodb::Collection<AttemptRecord> =
                mongo.collection("puzzle_attempts");

            let res: Result<(), mongodb::error::Error> =
                retry_async_with_config(RetryConfig::aggressive(), || async {
                    collection.insert_one(&record).await.map(|_| ())
                })
                .await;

            match res {
                Ok(()) => tracing::debug!("Attempt logged: id={}", record.id),
                Err(e) => tracing::error!("Background attempt insert failed: {:#?}", e),
            }
        });
    }
}
