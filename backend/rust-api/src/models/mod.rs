use serde::{Deserialize, Serialize};

/// Fallback applied when a puzzle row carries no rating.
pub const DEFAULT_PUZZLE_RATING: i32 = 600;

/// Puzzle document stored in the MongoDB "puzzles" collection. Field names
/// follow the Lichess puzzle export the collection is seeded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puzzle {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "FEN")]
    pub fen: String,
    /// Winning move sequence in UCI, space separated.
    #[serde(rename = "Moves")]
    pub moves: String,
    #[serde(rename = "Rating", default)]
    pub rating: Option<i32>,
    /// Space-separated theme tags, e.g. "mateIn1 short fork".
    #[serde(rename = "Themes", default)]
    pub themes: String,
}

impl Puzzle {
    pub fn rating_or_default(&self) -> i32 {
        self.rating.unwrap_or(DEFAULT_PUZZLE_RATING)
    }

    pub fn theme(&self) -> PuzzleTheme {
        PuzzleTheme::parse(&self.themes)
    }
}

/// Theme classes the selector distinguishes. Everything that is neither a
/// mate-in-one nor a hanging piece collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PuzzleTheme {
    MateIn1,
    HangingPiece,
    Other,
}

impl PuzzleTheme {
    /// mateIn1 takes precedence when a puzzle carries both tags.
    pub fn parse(themes: &str) -> Self {
        if themes.contains("mateIn1") {
            PuzzleTheme::MateIn1
        } else if themes.contains("hangingPiece") {
            PuzzleTheme::HangingPiece
        } else {
            PuzzleTheme::Other
        }
    }

    /// Tag as it appears inside the Themes field.
    pub fn tag(&self) -> &'static str {
        match self {
            PuzzleTheme::MateIn1 => "mateIn1",
            PuzzleTheme::HangingPiece => "hangingPiece",
            PuzzleTheme::Other => "other",
        }
    }
}

/// Puzzle payload returned to the client. The solution travels with the
/// puzzle because move validation happens on the device.
#[derive(Debug, Serialize)]
pub struct PuzzleView {
    pub id: String,
    pub fen: String,
    pub moves: String,
    pub rating: i32,
    pub theme: PuzzleTheme,
}

impl From<Puzzle> for PuzzleView {
    fn from(puzzle: Puzzle) -> Self {
        let rating = puzzle.rating_or_default();
        let theme = puzzle.theme();
        PuzzleView {
            id: puzzle.id,
            fen: puzzle.fen,
            moves: puzzle.moves,
            rating,
            theme,
        }
    }
}

pub mod attempt;
pub mod profile;
pub mod user;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parse_prefers_mate_in_one() {
        assert_eq!(
            PuzzleTheme::parse("mateIn1 hangingPiece short"),
            PuzzleTheme::MateIn1
        );
        assert_eq!(
            PuzzleTheme::parse("middlegame hangingPiece"),
            PuzzleTheme::HangingPiece
        );
        assert_eq!(PuzzleTheme::parse("endgame fork"), PuzzleTheme::Other);
    }

    #[test]
    fn missing_rating_falls_back() {
        let puzzle = Puzzle {
            id: "00sHx".to_string(),
            fen: "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3".to_string(),
            moves: "d8h4 f3h4".to_string(),
            rating: None,
            themes: String::new(),
        };
        assert_eq!(puzzle.rating_or_default(), DEFAULT_PUZZLE_RATING);
    }
}
