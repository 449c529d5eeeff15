use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::bson_datetime_as_chrono;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Correct,
    Incorrect,
    Skipped,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Correct => "correct",
            AttemptOutcome::Incorrect => "incorrect",
            AttemptOutcome::Skipped => "skipped",
        }
    }
}

/// One row of the append-only "puzzle_attempts" log. Written once per
/// resolved or skipped puzzle, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub puzzle_id: String,
    pub user_id: String,
    pub rating_before: i32,
    pub rating_after: i32,
    pub outcome: AttemptOutcome,
    pub used_hint: bool,
    pub used_solution: bool,
    pub time_to_solve_ms: i64,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    pub outcome: AttemptOutcome,
    #[serde(default)]
    pub used_hint: bool,
    #[serde(default)]
    pub used_solution: bool,
    /// Time to solve in milliseconds, as measured on the device.
    #[serde(default)]
    #[validate(range(min = 0, max = 86_400_000, message = "time_to_solve_ms out of range"))]
    pub time_to_solve_ms: i64,
}

impl SubmitAttemptRequest {
    /// Hint or revealed-solution use makes the attempt "aided": the rating
    /// is left untouched and the attempt does not count as attempted.
    pub fn aided(&self) -> bool {
        self.used_hint || self.used_solution
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub outcome: AttemptOutcome,
    pub rating_before: i32,
    pub rating_after: i32,
    pub rating_change: i32,
    pub current_streak: u32,
    pub highest_streak: u32,
    pub daily_challenge: DailyChallengeStatus,
    pub level_up: Option<LevelUp>,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyChallengeStatus {
    pub count: u32,
    pub goal: u32,
    pub completed_today: bool,
    pub day_streak: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LevelUp {
    pub from_level: u32,
    pub to_level: u32,
}
