//! # Routes
//!
//! Axum router configuration for the checkout API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main application router
///
/// Routes:
/// - Payments:
///   - GET /            - Start a payment with the configured flow
///   - GET /pay/precreate - Desktop QR code flow
///   - GET /pay/wap     - Mobile browser flow
///
/// - Gateway callbacks:
///   - POST /notify     - Async notification (replies `success`)
///   - GET  /callback   - Browser return page
///
/// - GET /health - Health check
pub fn create_router(state: AppState) -> Router {
    let pay_routes = Router::new()
        .route("/precreate", get(handlers::precreate))
        .route("/wap", get(handlers::wap_pay));

    Router::new()
        .route("/", get(handlers::pay_default))
        .route("/health", get(handlers::health))
        // Payments
        .nest("/pay", pay_routes)
        // Gateway callbacks
        .route("/notify", post(handlers::notify))
        .route("/callback", get(handlers::return_callback))
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
