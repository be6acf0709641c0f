//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check
/// - POST /api/v1/checkout - Store checkout records and pay
/// - GET  /api/v1/payments/{payment_id} - Stored payment
/// - POST /api/v1/payments/{payment_id}/pay - Re-run the pipeline
/// - GET  /api/v1/users/{user_id}/methods - Payment-method entry
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let payment_routes = Router::new()
        .route("/{payment_id}", get(handlers::get_payment))
        .route("/{payment_id}/pay", post(handlers::pay_payment));

    let api_routes = Router::new()
        .route("/checkout", post(handlers::checkout))
        .nest("/payments", payment_routes)
        .route("/users/{user_id}/methods", get(handlers::list_methods));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // State
        .with_state(state)
}
