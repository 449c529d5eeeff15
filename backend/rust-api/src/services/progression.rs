//! Progression bookkeeping: streaks, the daily challenge state machine over
//! calendar days, and the XP/level curve. Everything here is pure; the
//! attempt service applies it to a loaded profile and persists the result.

use crate::models::attempt::{AttemptOutcome, LevelUp};
use crate::models::profile::{LevelView, Profile};
use crate::utils::time::{missed_a_day, parse_day_key};
use chrono::NaiveDate;

/// Correct, un-aided solves needed to complete a day's challenge.
pub const DAILY_CHALLENGE_GOAL: u32 = 10;

/// XP awarded for each correct, un-aided solve.
pub const XP_PER_SOLVE: i64 = 10;

const BASE_XP_LEVEL_1: i64 = 30;
const XP_MULTIPLIER: f64 = 1.6;

/// Reset the daily counter when the stored date differs from `today`, and
/// adopt the new date. Returns true when a rollover happened.
pub fn roll_over_day(profile: &mut Profile, today: &str) -> bool {
    if profile.daily_date.as_deref() == Some(today) {
        return false;
    }
    profile.daily_count = 0;
    profile.daily_date = Some(today.to_string());
    true
}

/// Reset the day-streak when a full calendar day passed without completing
/// the challenge. Returns true when the streak was reset.
pub fn lapse_day_streak(profile: &mut Profile, today: NaiveDate) -> bool {
    let lapsed = profile
        .last_day_completed
        .as_deref()
        .and_then(parse_day_key)
        .map(|last| missed_a_day(last, today))
        .unwrap_or(false);

    if lapsed && profile.day_streak > 0 {
        profile.day_streak = 0;
        return true;
    }
    false
}

#[derive(Debug, Default)]
pub struct AttemptProgress {
    /// The daily goal was reached for the first time on `today`.
    pub challenge_completed_now: bool,
    pub level_up: Option<LevelUp>,
}

/// Apply one resolved or skipped attempt to the profile's streaks, daily
/// challenge, counters, and XP. The rating itself is updated separately by
/// the rating engine.
pub fn apply_attempt(
    profile: &mut Profile,
    outcome: AttemptOutcome,
    aided: bool,
    today: &str,
) -> AttemptProgress {
    roll_over_day(profile, today);

    let mut progress = AttemptProgress::default();

    match outcome {
        AttemptOutcome::Skipped => {}
        AttemptOutcome::Correct if !aided => {
            profile.puzzles_attempted += 1;
            profile.puzzles_solved += 1;

            profile.current_streak += 1;
            if profile.current_streak > profile.highest_streak {
                profile.highest_streak = profile.current_streak;
            }

            profile.daily_count += 1;
            if profile.daily_count >= DAILY_CHALLENGE_GOAL
                && profile.last_day_completed.as_deref() != Some(today)
            {
                profile.day_streak += 1;
                profile.last_day_completed = Some(today.to_string());
                progress.challenge_completed_now = true;
            }

            progress.level_up = add_xp(profile, XP_PER_SOLVE);
        }
        AttemptOutcome::Correct => {
            // Aided solve: no rating, no counters, streak untouched.
        }
        AttemptOutcome::Incorrect => {
            if !aided {
                profile.puzzles_attempted += 1;
            }
            profile.current_streak = 0;
        }
    }

    progress
}

/// Total XP required to reach `level` from zero.
pub fn xp_for_level(level: u32) -> i64 {
    if level <= 1 {
        return 0;
    }
    let mut xp = BASE_XP_LEVEL_1;
    for i in 2..level {
        xp += (BASE_XP_LEVEL_1 as f64 * XP_MULTIPLIER.powi(i as i32 - 1)).floor() as i64;
    }
    xp
}

pub fn level_for_xp(total_xp: i64) -> u32 {
    let mut level = 1;
    while total_xp >= xp_for_level(level + 1) {
        level += 1;
    }
    level
}

/// Add XP and report a level-up when one happened.
pub fn add_xp(profile: &mut Profile, amount: i64) -> Option<LevelUp> {
    let previous = level_for_xp(profile.total_xp);
    profile.total_xp += amount;
    let current = level_for_xp(profile.total_xp);

    (current > previous).then_some(LevelUp {
        from_level: previous,
        to_level: current,
    })
}

pub fn level_view(total_xp: i64) -> LevelView {
    let level = level_for_xp(total_xp);
    let floor = xp_for_level(level);
    let next = xp_for_level(level + 1);
    let needed = next - floor;
    let in_level = total_xp - floor;

    LevelView {
        total_xp,
        level,
        xp_in_level: in_level,
        xp_to_next_level: next,
        progress: if needed > 0 {
            in_level as f64 / needed as f64
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile() -> Profile {
        Profile::new("u1", Utc::now())
    }

    #[test]
    fn daily_counter_resets_on_date_change() {
        let mut p = profile();
        p.daily_date = Some("2026-08-05".to_string());
        p.daily_count = 7;

        assert!(roll_over_day(&mut p, "2026-08-06"));
        assert_eq!(p.daily_count, 0);
        assert_eq!(p.daily_date.as_deref(), Some("2026-08-06"));

        // Same day again: nothing changes.
        p.daily_count = 3;
        assert!(!roll_over_day(&mut p, "2026-08-06"));
        assert_eq!(p.daily_count, 3);
    }

    #[test]
    fn day_streak_survives_yesterday_but_not_a_missed_day() {
        let mut p = profile();
        p.day_streak = 4;
        p.last_day_completed = Some("2026-08-05".to_string());
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert!(!lapse_day_streak(&mut p, today));
        assert_eq!(p.day_streak, 4);

        p.last_day_completed = Some("2026-08-03".to_string());
        assert!(lapse_day_streak(&mut p, today));
        assert_eq!(p.day_streak, 0);
    }

    #[test]
    fn tenth_solve_completes_the_challenge_once() {
        let mut p = profile();
        let today = "2026-08-06";

        for i in 1..=9 {
            let progress = apply_attempt(&mut p, AttemptOutcome::Correct, false, today);
            assert!(!progress.challenge_completed_now, "solve {} too early", i);
        }
        assert_eq!(p.daily_count, 9);
        assert_eq!(p.day_streak, 0);

        let progress = apply_attempt(&mut p, AttemptOutcome::Correct, false, today);
        assert!(progress.challenge_completed_now);
        assert_eq!(p.day_streak, 1);
        assert_eq!(p.last_day_completed.as_deref(), Some(today));

        // An eleventh solve the same day must not re-increment.
        let progress = apply_attempt(&mut p, AttemptOutcome::Correct, false, today);
        assert!(!progress.challenge_completed_now);
        assert_eq!(p.day_streak, 1);
    }

    #[test]
    fn streak_resets_on_incorrect_only() {
        let mut p = profile();
        let today = "2026-08-06";

        apply_attempt(&mut p, AttemptOutcome::Correct, false, today);
        apply_attempt(&mut p, AttemptOutcome::Correct, false, today);
        assert_eq!(p.current_streak, 2);

        apply_attempt(&mut p, AttemptOutcome::Skipped, false, today);
        assert_eq!(p.current_streak, 2);

        apply_attempt(&mut p, AttemptOutcome::Incorrect, false, today);
        assert_eq!(p.current_streak, 0);
        assert_eq!(p.highest_streak, 2);
    }

    #[test]
    fn aided_attempts_do_not_count() {
        let mut p = profile();
        let today = "2026-08-06";

        apply_attempt(&mut p, AttemptOutcome::Correct, true, today);
        assert_eq!(p.puzzles_attempted, 0);
        assert_eq!(p.puzzles_solved, 0);
        assert_eq!(p.daily_count, 0);
        assert_eq!(p.total_xp, 0);
    }

    #[test]
    fn xp_curve_matches_expected_thresholds() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 30);
        // 30 + floor(30 * 1.6)
        assert_eq!(xp_for_level(3), 78);
        // 78 + floor(30 * 1.6^2)
        assert_eq!(xp_for_level(4), 154);
    }

    #[test]
    fn level_for_xp_is_consistent_with_curve() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(29), 1);
        assert_eq!(level_for_xp(30), 2);
        assert_eq!(level_for_xp(77), 2);
        assert_eq!(level_for_xp(78), 3);
    }

    #[test]
    fn add_xp_reports_level_up() {
        let mut p = profile();
        assert_eq!(add_xp(&mut p, 29), None);
        let up = add_xp(&mut p, 1).expect("level up");
        assert_eq!(up.from_level, 1);
        assert_eq!(up.to_level, 2);
    }

    #[test]
    fn level_view_breaks_down_progress() {
        let view = level_view(40);
        assert_eq!(view.level, 2);
        assert_eq!(view.xp_in_level, 10);
        assert_eq!(view.xp_to_next_level, 78);
        assert!((view.progress - 10.0 / 48.0).abs() < 1e-12);
    }
}
