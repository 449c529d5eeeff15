use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::metrics::{record_prefetch_hit, record_prefetch_miss, PUZZLES_SERVED_TOTAL};
use crate::models::{Puzzle, PuzzleTheme};

use super::puzzle_catalog::PuzzleCatalog;

/// Half-width of the rating band around the user's rating.
pub const RATING_BAND: i32 = 40;
/// The band never reaches below this rating.
pub const MIN_RATING_FLOOR: i32 = 300;
/// The upper bound never drops below this rating.
pub const MAX_RATING_FLOOR: i32 = 450;

/// Probability of preferring a mate-in-one over a hanging piece.
const MATE_IN_ONE_BIAS: f64 = 0.7;

/// TTL on the per-user prefetch slot; a stale slot just means one
/// synchronous query.
const PREFETCH_TTL_SECONDS: u64 = 900;

/// How the served puzzle was obtained, for metrics and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
    Prefetch,
    Query,
    Fallback,
}

impl ServeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServeSource::Prefetch => "prefetch",
            ServeSource::Query => "query",
            ServeSource::Fallback => "fallback",
        }
    }
}

pub struct PuzzleService {
    catalog: Arc<dyn PuzzleCatalog>,
    redis: ConnectionManager,
}

impl PuzzleService {
    pub fn new(catalog: Arc<dyn PuzzleCatalog>, redis: ConnectionManager) -> Self {
        Self { catalog, redis }
    }

    /// Serve the next puzzle: consume the prefetch slot when it is filled,
    /// otherwise query synchronously. Either way a background prefetch is
    /// kicked off for the request after this one. Returns `None` only when
    /// the catalog is empty.
    pub async fn next_puzzle(
        &self,
        user_id: &str,
        rating: i32,
    ) -> Result<Option<(Puzzle, ServeSource)>> {
        if let Some(puzzle) = self.take_prefetched(user_id).await {
            record_prefetch_hit();
            PUZZLES_SERVED_TOTAL
                .with_label_values(&[ServeSource::Prefetch.as_str()])
                .inc();
            self.spawn_prefetch(user_id, rating);
            return Ok(Some((puzzle, ServeSource::Prefetch)));
        }
        record_prefetch_miss();

        let selected = self.select(user_id, rating).await?;

        if let Some((_, source)) = &selected {
            PUZZLES_SERVED_TOTAL
                .with_label_values(&[source.as_str()])
                .inc();
            self.spawn_prefetch(user_id, rating);
        }

        Ok(selected)
    }

    /// One pass of the selection policy with a freshly rolled theme bias.
    pub async fn select(&self, user_id: &str, rating: i32) -> Result<Option<(Puzzle, ServeSource)>> {
        let preferred = if rand::random::<f64>() < MATE_IN_ONE_BIAS {
            PuzzleTheme::MateIn1
        } else {
            PuzzleTheme::HangingPiece
        };
        self.select_with_preference(user_id, rating, preferred).await
    }

    pub async fn select_with_preference(
        &self,
        user_id: &str,
        rating: i32,
        preferred: PuzzleTheme,
    ) -> Result<Option<(Puzzle, ServeSource)>> {
        select_from_catalog(self.catalog.as_ref(), user_id, rating, preferred).await
    }

    pub async fn find_by_id(&self, puzzle_id: &str) -> Result<Option<Puzzle>> {
        self.catalog.find_by_id(puzzle_id).await
    }

    /// Read and clear the one-slot prefetch cache. Redis errors degrade to a
    /// cache miss.
    async fn take_prefetched(&self, user_id: &str) -> Option<Puzzle> {
        let mut conn = self.redis.clone();
        let slot_key = prefetch_key(user_id);

        let cached: Option<String> = match redis::cmd("GETDEL")
            .arg(&slot_key)
            .query_async(&mut conn)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Prefetch slot read failed: {}", e);
                return None;
            }
        };

        cached.and_then(|json| match serde_json::from_str(&json) {
            Ok(puzzle) => Some(puzzle),
            Err(e) => {
                tracing::warn!("Discarding undecodable prefetch slot: {}", e);
                None
            }
        })
    }

    /// Fill the prefetch slot in the background. Whichever write lands last
    /// wins the slot; failures only cost the next request a synchronous
    /// query, so they are logged and dropped.
    fn spawn_prefetch(&self, user_id: &str, rating: i32) {
        let catalog = self.catalog.clone();
        let redis = self.redis.clone();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let service = PuzzleService::new(catalog, redis);
            match service.select(&user_id, rating).await {
                Ok(Some((puzzle, _))) => {
                    if let Err(e) = service.store_prefetched(&user_id, &puzzle).await {
                        tracing::warn!("Prefetch store failed for user {}: {}", user_id, e);
                    } else {
                        tracing::debug!("Prefetched puzzle {} for user {}", puzzle.id, user_id);
                    }
                }
                Ok(None) => {
                    tracing::debug!("Nothing to prefetch for user {}", user_id);
                }
                Err(e) => {
                    tracing::warn!("Prefetch query failed for user {}: {}", user_id, e);
                }
            }
        });
    }

    async fn store_prefetched(&self, user_id: &str, puzzle: &Puzzle) -> Result<()> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(puzzle).context("Failed to serialize puzzle")?;

        redis::cmd("SETEX")
            .arg(prefetch_key(user_id))
            .arg(PREFETCH_TTL_SECONDS)
            .arg(json)
            .query_async::<()>(&mut conn)
            .await
            .context("Failed to write prefetch slot")?;

        Ok(())
    }
}

/// The selection policy itself: band + unattempted + preferred theme, then
/// band + unattempted, then any puzzle at all. Never errors unless the
/// repository is unreachable.
pub async fn select_from_catalog(
    catalog: &dyn PuzzleCatalog,
    user_id: &str,
    rating: i32,
    preferred: PuzzleTheme,
) -> Result<Option<(Puzzle, ServeSource)>> {
    let attempted = catalog.attempted_ids(user_id).await?;
    let (min_rating, max_rating) = rating_band(rating);

    if let Some(puzzle) = catalog
        .find_in_band(min_rating, max_rating, &attempted, Some(preferred))
        .await?
    {
        return Ok(Some((puzzle, ServeSource::Query)));
    }

    if let Some(puzzle) = catalog
        .find_in_band(min_rating, max_rating, &attempted, None)
        .await?
    {
        return Ok(Some((puzzle, ServeSource::Query)));
    }

    tracing::info!(
        user_id,
        min_rating,
        max_rating,
        "no unattempted puzzle in rating band, widening search"
    );

    Ok(catalog
        .find_any()
        .await?
        .map(|puzzle| (puzzle, ServeSource::Fallback)))
}

/// `[max(300, R-40), max(450, R+40)]`
pub fn rating_band(rating: i32) -> (i32, i32) {
    (
        std::cmp::max(MIN_RATING_FLOOR, rating - RATING_BAND),
        std::cmp::max(MAX_RATING_FLOOR, rating + RATING_BAND),
    )
}

fn prefetch_key(user_id: &str) -> String {
    format!("puzzle:prefetch:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_is_centered_once_above_the_floors() {
        assert_eq!(rating_band(600), (560, 640));
        assert_eq!(rating_band(1200), (1160, 1240));
    }

    #[test]
    fn band_floors_apply_for_new_players() {
        // A fresh profile at 300 still sees [300, 450].
        assert_eq!(rating_band(300), (300, 450));
        assert_eq!(rating_band(200), (300, 450));
        assert_eq!(rating_band(430), (390, 470));
    }
}
