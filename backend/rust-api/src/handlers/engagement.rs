use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::{
    middlewares::auth::JwtClaims,
    services::{review_service::ReviewService, AppState},
};

use super::ApiError;

/// The client reports each foregrounding of the app; openings feed the
/// review-prompt conditions.
pub async fn log_opening(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    ReviewService::new(state.mongo.clone())
        .log_opening(&claims.sub)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to record opening: {}", e)))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Ask whether the store-review dialog should be shown now. A `true` answer
/// is recorded, so the dialog is offered at most once per cooldown window.
pub async fn review_prompt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let show = ReviewService::new(state.mongo.clone())
        .maybe_request_review(&claims.sub)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to evaluate review prompt: {}", e)))?;

    Ok(Json(json!({ "show_review_prompt": show })))
}
