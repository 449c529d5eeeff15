use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // The app ships as a Capacitor webview, so the API answers cross-origin
    // requests from the device-local origin.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1/auth", auth_routes(app_state.clone()))
        // Gameplay endpoints (require JWT)
        .nest(
            "/api/v1/puzzles",
            puzzle_routes()
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::rate_limit::rate_limit_middleware,
                ))
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::auth_middleware,
                )),
        )
        .nest(
            "/api/v1/profile",
            profile_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/api/v1/engagement",
            engagement_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn puzzle_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/next", get(handlers::puzzles::next_puzzle))
        .route("/{id}", get(handlers::puzzles::get_puzzle))
        .route("/{id}/attempts", post(handlers::puzzles::submit_attempt))
}

fn profile_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", get(handlers::profile::get_profile))
        .route("/level", get(handlers::profile::get_level))
}

fn engagement_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/openings", post(handlers::engagement::log_opening))
        .route("/review-prompt", post(handlers::engagement::review_prompt))
}

fn auth_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    // Public sign-in with rate limiting
    let signin_route = Router::new()
        .route("/anonymous", post(handlers::auth::sign_in_anonymously))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::rate_limit::signin_rate_limit_middleware,
        ));

    // Protected routes (require JWT auth)
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_current_user))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::auth_middleware,
        ));

    signin_route.merge(protected_routes)
}
