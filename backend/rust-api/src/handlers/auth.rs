use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::Utc;
use mongodb::bson::doc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    metrics::ANONYMOUS_SIGNINS_TOTAL,
    middlewares::auth::{JwtClaims, JwtService},
    models::user::{AuthResponse, User, UserView},
    services::{profile_service::ProfileService, AppState},
};

use super::ApiError;

/// Create an anonymous user on first launch and hand back a bearer token.
/// The device stores the token; there is no credential to remember.
pub async fn sign_in_anonymously(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        anonymous: true,
        created_at: Utc::now(),
        last_seen_at: None,
    };

    state
        .mongo
        .collection::<User>("users")
        .insert_one(&user)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create anonymous user: {}", e);
            ApiError::internal("Failed to create user")
        })?;

    // Profile exists from the first request on, rating seeded at 300.
    ProfileService::new(state.mongo.clone())
        .load_or_create(&user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create profile for {}: {}", user.id, e);
            ApiError::internal("Failed to create profile")
        })?;

    let token = JwtService::new(&state.config.jwt_secret)
        .issue_for_user(&user.id, true)
        .map_err(|e| {
            tracing::error!("Failed to issue token: {}", e);
            ApiError::internal("Failed to issue token")
        })?;

    ANONYMOUS_SIGNINS_TOTAL.inc();
    tracing::info!("Anonymous user created: {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token: token,
            user: user.into(),
        }),
    ))
}

pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Json<UserView>, ApiError> {
    let user = state
        .mongo
        .collection::<User>("users")
        .find_one(doc! { "_id": &claims.sub })
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}
