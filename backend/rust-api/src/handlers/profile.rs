use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    middlewares::auth::JwtClaims,
    models::profile::{LevelView, ProfileView},
    services::{profile_service::ProfileService, progression, AppState},
};

use super::ApiError;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<ProfileView>, ApiError> {
    let profile = ProfileService::new(state.mongo.clone())
        .load_or_create(&claims.sub)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load profile: {}", e)))?;

    Ok(Json(ProfileView {
        user_id: profile.user_id,
        rating: profile.rating,
        current_streak: profile.current_streak,
        highest_streak: profile.highest_streak,
        puzzles_solved: profile.puzzles_solved,
        puzzles_attempted: profile.puzzles_attempted,
        daily_count: profile.daily_count,
        daily_goal: progression::DAILY_CHALLENGE_GOAL,
        day_streak: profile.day_streak,
        best_time_ms: profile.best_time_ms,
        average_time_ms: profile.average_time_ms,
        total_time_ms: profile.total_time_ms,
    }))
}

pub async fn get_level(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<LevelView>, ApiError> {
    let profile = ProfileService::new(state.mongo.clone())
        .load_or_create(&claims.sub)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load profile: {}", e)))?;

    Ok(Json(progression::level_view(profile.total_xp)))
}
