//! Elo-style rating engine. Pure arithmetic; persistence and orchestration
//! live in the attempt service.

use crate::models::attempt::AttemptOutcome;

/// Sensitivity of a single attempt on the rating.
pub const K_FACTOR: f64 = 20.0;

/// Rating assigned to a freshly created profile.
pub const INITIAL_RATING: i32 = 300;

/// Expected score of the user against a puzzle, in (0, 1).
pub fn expected_score(user_rating: i32, puzzle_rating: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(puzzle_rating - user_rating) / 400.0))
}

/// `round(current + k * (actual - expected))` with the default K-factor.
pub fn updated_rating(current: i32, expected: f64, actual: f64) -> i32 {
    updated_rating_with_k(current, expected, actual, K_FACTOR)
}

pub fn updated_rating_with_k(current: i32, expected: f64, actual: f64, k: f64) -> i32 {
    (f64::from(current) + k * (actual - expected)).round() as i32
}

/// Rating after one attempt. Aided attempts (hint or revealed solution) and
/// skips leave the rating exactly unchanged regardless of the outcome.
pub fn rating_after_attempt(
    current: i32,
    puzzle_rating: i32,
    outcome: AttemptOutcome,
    aided: bool,
) -> i32 {
    if aided || outcome == AttemptOutcome::Skipped {
        return current;
    }

    let actual = match outcome {
        AttemptOutcome::Correct => 1.0,
        _ => 0.0,
    };
    updated_rating(current, expected_score(current, puzzle_rating), actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings_give_even_odds() {
        for rating in [100, 300, 600, 1500, 2400] {
            let e = expected_score(rating, rating);
            assert!((e - 0.5).abs() < 1e-12, "expected 0.5 for {}", rating);
        }
    }

    #[test]
    fn expected_score_stays_in_open_interval() {
        assert!(expected_score(300, 2800) > 0.0);
        assert!(expected_score(2800, 300) < 1.0);
    }

    #[test]
    fn correct_solve_at_own_level_gains_ten() {
        // R=300 vs puzzle 300: expected 0.5, round(300 + 20*0.5) = 310
        let e = expected_score(300, 300);
        assert_eq!(updated_rating(300, e, 1.0), 310);
    }

    #[test]
    fn incorrect_solve_loses_rating() {
        // R=310 vs puzzle 350: expected 1/(1+10^(40/400))
        let e = expected_score(310, 350);
        assert!((e - 0.4427).abs() < 1e-3);
        assert_eq!(updated_rating(310, e, 0.0), 301);
    }

    #[test]
    fn update_direction_matches_outcome() {
        for (user, puzzle) in [(300, 280), (300, 300), (300, 340), (900, 1200)] {
            let e = expected_score(user, puzzle);
            assert!(updated_rating(user, e, 1.0) >= user);
            assert!(updated_rating(user, e, 0.0) <= user);
        }
    }

    #[test]
    fn aided_attempt_leaves_rating_unchanged() {
        assert_eq!(
            rating_after_attempt(300, 300, AttemptOutcome::Correct, true),
            300
        );
        assert_eq!(
            rating_after_attempt(300, 500, AttemptOutcome::Incorrect, true),
            300
        );
    }

    #[test]
    fn skip_leaves_rating_unchanged() {
        assert_eq!(
            rating_after_attempt(420, 380, AttemptOutcome::Skipped, false),
            420
        );
    }

    #[test]
    fn unaided_attempt_applies_elo_update() {
        assert_eq!(
            rating_after_attempt(300, 300, AttemptOutcome::Correct, false),
            310
        );
        assert_eq!(
            rating_after_attempt(310, 350, AttemptOutcome::Incorrect, false),
            301
        );
    }
}
