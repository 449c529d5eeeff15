use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use chess_patterns_api::models::{Puzzle, PuzzleTheme};
use chess_patterns_api::services::puzzle_catalog::PuzzleCatalog;

/// Catalog backed by plain vectors, mirroring the query semantics the Mongo
/// implementation relies on: first match wins, rating band inclusive,
/// exclusion by id.
pub struct InMemoryCatalog {
    puzzles: Vec<Puzzle>,
    attempts: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryCatalog {
    pub fn new(puzzles: Vec<Puzzle>) -> Self {
        Self {
            puzzles,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_attempt(&self, user_id: &str, puzzle_id: &str) {
        self.attempts
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(puzzle_id.to_string());
    }
}

#[async_trait]
impl PuzzleCatalog for InMemoryCatalog {
    async fn attempted_ids(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_in_band(
        &self,
        min_rating: i32,
        max_rating: i32,
        exclude: &[String],
        theme: Option<PuzzleTheme>,
    ) -> Result<Option<Puzzle>> {
        Ok(self
            .puzzles
            .iter()
            .find(|p| {
                let rating = match p.rating {
                    Some(r) => r,
                    None => return false,
                };
                if rating < min_rating || rating > max_rating {
                    return false;
                }
                if exclude.contains(&p.id) {
                    return false;
                }
                match theme {
                    Some(t) => p.themes.contains(t.tag()),
                    None => true,
                }
            })
            .cloned())
    }

    async fn find_any(&self) -> Result<Option<Puzzle>> {
        Ok(self.puzzles.first().cloned())
    }

    async fn find_by_id(&self, puzzle_id: &str) -> Result<Option<Puzzle>> {
        Ok(self.puzzles.iter().find(|p| p.id == puzzle_id).cloned())
    }
}

pub fn puzzle(id: &str, rating: i32, themes: &str) -> Puzzle {
    Puzzle {
        id: id.to_string(),
        fen: "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1".to_string(),
        moves: "d1d8 g8h7".to_string(),
        rating: Some(rating),
        themes: themes.to_string(),
    }
}
