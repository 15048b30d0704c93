//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware::ServerSettings, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, settings: ServerSettings) -> Router {
    Router::new()
        .route("/api/details", post(handlers::extract_details))
        .route("/api/saveDetails", post(handlers::save_details))
        .route("/api/saveDetailsExisting", post(handlers::save_details_existing))
        .route("/api/customer/:cust_id", patch(handlers::patch_customer))
        .route("/api/customerDetailsCustID", post(handlers::customer_details))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}
