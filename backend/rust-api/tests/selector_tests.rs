use chess_patterns_api::models::PuzzleTheme;
use chess_patterns_api::services::puzzle_service::{
    rating_band, select_from_catalog, ServeSource,
};

mod common;

use common::{puzzle, InMemoryCatalog};

#[tokio::test]
async fn prefers_the_biased_theme_inside_the_band() {
    let catalog = InMemoryCatalog::new(vec![
        puzzle("hang1", 320, "hangingPiece middlegame"),
        puzzle("mate1", 330, "mateIn1 short"),
    ]);

    let (selected, source) = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::MateIn1)
        .await
        .unwrap()
        .expect("a puzzle");

    assert_eq!(selected.id, "mate1");
    assert_eq!(source, ServeSource::Query);

    let (selected, _) = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::HangingPiece)
        .await
        .unwrap()
        .expect("a puzzle");
    assert_eq!(selected.id, "hang1");
}

#[tokio::test]
async fn falls_through_to_any_theme_when_preference_is_empty() {
    let catalog = InMemoryCatalog::new(vec![puzzle("endg1", 340, "endgame rookEndgame")]);

    let (selected, source) = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::MateIn1)
        .await
        .unwrap()
        .expect("a puzzle");

    assert_eq!(selected.id, "endg1");
    assert_eq!(source, ServeSource::Query);
}

#[tokio::test]
async fn attempted_puzzles_are_excluded() {
    let catalog = InMemoryCatalog::new(vec![
        puzzle("mate1", 320, "mateIn1"),
        puzzle("mate2", 340, "mateIn1"),
    ]);
    catalog.record_attempt("u1", "mate1");

    let (selected, _) = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::MateIn1)
        .await
        .unwrap()
        .expect("a puzzle");

    assert_eq!(selected.id, "mate2");
}

#[tokio::test]
async fn widens_outside_the_band_instead_of_failing() {
    // Band for rating 300 is [300, 450]; the only puzzle sits well above it.
    let catalog = InMemoryCatalog::new(vec![puzzle("hard1", 1200, "fork")]);

    let (selected, source) = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::MateIn1)
        .await
        .unwrap()
        .expect("a puzzle");

    assert_eq!(selected.id, "hard1");
    assert_eq!(source, ServeSource::Fallback);
}

#[tokio::test]
async fn degraded_path_even_serves_attempted_puzzles() {
    let catalog = InMemoryCatalog::new(vec![puzzle("only1", 350, "mateIn1")]);
    catalog.record_attempt("u1", "only1");

    // Everything is attempted, so the unattempted filter is dropped.
    let (selected, source) = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::MateIn1)
        .await
        .unwrap()
        .expect("a puzzle");

    assert_eq!(selected.id, "only1");
    assert_eq!(source, ServeSource::Fallback);
}

#[tokio::test]
async fn empty_catalog_yields_none_not_an_error() {
    let catalog = InMemoryCatalog::new(vec![]);

    let result = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::MateIn1)
        .await
        .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn band_respects_floors_for_fresh_profiles() {
    // A fresh profile rated 300 must still see puzzles up to 450.
    assert_eq!(rating_band(300), (300, 450));

    let catalog = InMemoryCatalog::new(vec![puzzle("mid1", 440, "mateIn1")]);
    let (selected, source) = select_from_catalog(&catalog, "u1", 300, PuzzleTheme::MateIn1)
        .await
        .unwrap()
        .expect("a puzzle");

    assert_eq!(selected.id, "mid1");
    assert_eq!(source, ServeSource::Query, "440 is inside [300, 450]");
}
