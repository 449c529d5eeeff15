use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::{bson_datetime_as_chrono, bson_datetime_as_chrono_option};
use crate::services::rating::INITIAL_RATING;

/// Per-user snapshot stored in the MongoDB "profiles" collection. Mirrors
/// what the client keeps locally; the rating field is only ever mutated by
/// the rating engine after a resolved, un-aided attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub rating: i32,

    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub highest_streak: u32,
    #[serde(default)]
    pub puzzles_solved: u32,
    #[serde(default)]
    pub puzzles_attempted: u32,

    /// Correct un-aided solves since the start of `daily_date`.
    #[serde(default)]
    pub daily_count: u32,
    /// Day key ("YYYY-MM-DD") the daily counter belongs to.
    #[serde(default)]
    pub daily_date: Option<String>,
    #[serde(default)]
    pub day_streak: u32,
    /// Day key of the last date the daily goal was reached.
    #[serde(default)]
    pub last_day_completed: Option<String>,

    #[serde(default)]
    pub total_xp: i64,

    // Solve-time statistics, all in milliseconds.
    #[serde(default)]
    pub best_time_ms: Option<i64>,
    #[serde(default)]
    pub average_time_ms: Option<f64>,
    #[serde(default)]
    pub total_time_ms: i64,

    /// Recent app-opening timestamps (epoch millis), capped to the last 100.
    #[serde(default)]
    pub app_openings: Vec<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub last_review_request: Option<DateTime<Utc>>,

    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Profile {
            user_id: user_id.to_string(),
            rating: INITIAL_RATING,
            current_streak: 0,
            highest_streak: 0,
            puzzles_solved: 0,
            puzzles_attempted: 0,
            daily_count: 0,
            daily_date: None,
            day_streak: 0,
            last_day_completed: None,
            total_xp: 0,
            best_time_ms: None,
            average_time_ms: None,
            total_time_ms: 0,
            app_openings: Vec::new(),
            last_review_request: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold one solve time into the running best/average/total statistics.
    /// The completed-puzzle count is reconstructed from total/average, so the
    /// stats survive without a dedicated counter.
    pub fn record_solve_time(&mut self, time_ms: i64) {
        if time_ms <= 0 {
            return;
        }

        if self.best_time_ms.map_or(true, |best| time_ms < best) {
            self.best_time_ms = Some(time_ms);
        }

        self.average_time_ms = Some(match self.average_time_ms {
            None => time_ms as f64,
            Some(avg) => {
                let completed = if self.total_time_ms > 0 && avg > 0.0 {
                    (self.total_time_ms as f64 / avg).round()
                } else {
                    0.0
                };
                (avg * completed + time_ms as f64) / (completed + 1.0)
            }
        });

        self.total_time_ms += time_ms;
    }
}

/// Profile payload returned to the client.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user_id: String,
    pub rating: i32,
    pub current_streak: u32,
    pub highest_streak: u32,
    pub puzzles_solved: u32,
    pub puzzles_attempted: u32,
    pub daily_count: u32,
    pub daily_goal: u32,
    pub day_streak: u32,
    pub best_time_ms: Option<i64>,
    pub average_time_ms: Option<f64>,
    pub total_time_ms: i64,
}

/// XP/level breakdown for the level screen.
#[derive(Debug, Serialize, PartialEq)]
pub struct LevelView {
    pub total_xp: i64,
    pub level: u32,
    pub xp_in_level: i64,
    pub xp_to_next_level: i64,
    pub progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_solve_time_sets_all_stats() {
        let mut profile = Profile::new("u1", Utc::now());
        profile.record_solve_time(12_000);

        assert_eq!(profile.best_time_ms, Some(12_000));
        assert_eq!(profile.average_time_ms, Some(12_000.0));
        assert_eq!(profile.total_time_ms, 12_000);
    }

    #[test]
    fn best_time_only_improves() {
        let mut profile = Profile::new("u1", Utc::now());
        profile.record_solve_time(10_000);
        profile.record_solve_time(30_000);
        assert_eq!(profile.best_time_ms, Some(10_000));

        profile.record_solve_time(5_000);
        assert_eq!(profile.best_time_ms, Some(5_000));
    }

    #[test]
    fn average_folds_in_new_times() {
        let mut profile = Profile::new("u1", Utc::now());
        profile.record_solve_time(10_000);
        profile.record_solve_time(20_000);

        assert_eq!(profile.average_time_ms, Some(15_000.0));
        assert_eq!(profile.total_time_ms, 30_000);
    }

    #[test]
    fn non_positive_times_are_ignored() {
        let mut profile = Profile::new("u1", Utc::now());
        profile.record_solve_time(0);
        profile.record_solve_time(-5);

        assert_eq!(profile.best_time_ms, None);
        assert_eq!(profile.total_time_ms, 0);
    }
}
