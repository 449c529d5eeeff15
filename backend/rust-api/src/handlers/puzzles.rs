use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::{attempt::SubmitAttemptRequest, PuzzleView},
    services::{
        attempt_service::AttemptService,
        profile_service::ProfileService,
        puzzle_catalog::MongoPuzzleCatalog,
        puzzle_service::PuzzleService,
        AppState,
    },
};

use super::ApiError;

fn puzzle_service(state: &AppState) -> PuzzleService {
    PuzzleService::new(
        Arc::new(MongoPuzzleCatalog::new(state.mongo.clone())),
        state.redis.clone(),
    )
}

/// Serve the next puzzle for the authenticated user: rating band around the
/// current rating, unattempted only, theme-biased, with fallback widening.
pub async fn next_puzzle(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<PuzzleView>, ApiError> {
    let profile = ProfileService::new(state.mongo.clone())
        .load_or_create(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load profile for {}: {}", claims.sub, e);
            ApiError::Retrieval
        })?;

    match puzzle_service(&state)
        .next_puzzle(&claims.sub, profile.rating)
        .await
    {
        Ok(Some((puzzle, source))) => {
            tracing::info!(
                "Serving puzzle {} to user {} (source: {})",
                puzzle.id,
                claims.sub,
                source.as_str()
            );
            Ok(Json(puzzle.into()))
        }
        Ok(None) => {
            tracing::error!("Puzzle catalog is empty");
            Err(ApiError::Retrieval)
        }
        Err(e) => {
            tracing::error!("Failed to select puzzle for {}: {}", claims.sub, e);
            Err(ApiError::Retrieval)
        }
    }
}

pub async fn get_puzzle(
    State(state): State<Arc<AppState>>,
    Path(puzzle_id): Path<String>,
) -> Result<Json<PuzzleView>, ApiError> {
    match puzzle_service(&state).find_by_id(&puzzle_id).await {
        Ok(Some(puzzle)) => Ok(Json(puzzle.into())),
        Ok(None) => Err(ApiError::not_found("Puzzle not found")),
        Err(e) => {
            tracing::error!("Failed to load puzzle {}: {}", puzzle_id, e);
            Err(ApiError::Retrieval)
        }
    }
}

/// Record one attempt against a puzzle. Rating, streaks, the daily
/// challenge, and XP all move here; the attempt row lands in the log in the
/// background.
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(puzzle_id): Path<String>,
    AppJson(req): AppJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Invalid attempt: {}", e)))?;

    let service = AttemptService::new(state.mongo.clone());

    match service.submit_attempt(&claims.sub, &puzzle_id, &req).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("Puzzle not found") {
                return Err(ApiError::not_found(msg));
            }
            tracing::error!("Failed to submit attempt: {}", e);
            Err(ApiError::internal("Failed to record attempt"))
        }
    }
}
