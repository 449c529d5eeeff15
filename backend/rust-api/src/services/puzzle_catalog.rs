use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::bson::{doc, Bson};
use mongodb::Database;

use crate::models::{Puzzle, PuzzleTheme};

/// Read access to the puzzle repository, injected into the selector so the
/// fallback policy can be exercised against an in-memory catalog in tests.
#[async_trait]
pub trait PuzzleCatalog: Send + Sync {
    /// Identifiers of every puzzle the user has already attempted.
    async fn attempted_ids(&self, user_id: &str) -> Result<Vec<String>>;

    /// One puzzle with rating in `[min_rating, max_rating]`, not in
    /// `exclude`, optionally restricted to a theme tag.
    async fn find_in_band(
        &self,
        min_rating: i32,
        max_rating: i32,
        exclude: &[String],
        theme: Option<PuzzleTheme>,
    ) -> Result<Option<Puzzle>>;

    /// Any puzzle at all; the most degraded fallback.
    async fn find_any(&self) -> Result<Option<Puzzle>>;

    async fn find_by_id(&self, puzzle_id: &str) -> Result<Option<Puzzle>>;
}

pub struct MongoPuzzleCatalog {
    mongo: Database,
}

impl MongoPuzzleCatalog {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn puzzles(&self) -> mongodb::Collection<Puzzle> {
        self.mongo.collection("puzzles")
    }
}

#[async_trait]
impl PuzzleCatalog for MongoPuzzleCatalog {
    async fn attempted_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let collection = self
            .mongo
            .collection::<mongodb::bson::Document>("puzzle_attempts");

        let ids = collection
            .distinct("puzzle_id", doc! { "user_id": user_id })
            .await
            .context("Failed to query attempted puzzle ids")?;

        Ok(ids
            .into_iter()
            .filter_map(|value| match value {
                Bson::String(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    async fn find_in_band(
        &self,
        min_rating: i32,
        max_rating: i32,
        exclude: &[String],
        theme: Option<PuzzleTheme>,
    ) -> Result<Option<Puzzle>> {
        let mut filter = doc! { "Rating": { "$gte": min_rating, "$lte": max_rating } };

        if !exclude.is_empty() {
            let ids: Vec<Bson> = exclude.iter().map(|id| Bson::String(id.clone())).collect();
            filter.insert("_id", doc! { "$nin": ids });
        }

        if let Some(theme) = theme {
            filter.insert("Themes", doc! { "$regex": theme.tag() });
        }

        self.puzzles()
            .find_one(filter)
            .await
            .context("Failed to query puzzles in rating band")
    }

    async fn find_any(&self) -> Result<Option<Puzzle>> {
        self.puzzles()
            .find_one(doc! {})
            .await
            .context("Failed to query fallback puzzle")
    }

    async fn find_by_id(&self, puzzle_id: &str) -> Result<Option<Puzzle>> {
        self.puzzles()
            .find_one(doc! { "_id": puzzle_id })
            .await
            .context("Failed to query puzzle by id")
    }
}
