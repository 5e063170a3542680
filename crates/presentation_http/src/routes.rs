//! Route definitions

use axum::Router;
use axum::routing::{delete, get, post};

use crate::handlers;
use crate::state::AppState;

/// Create the main router: control plane under `/faultline/v1`, data
/// plane as the fallback
///
/// A destination service named `health` or `faultline` would be shadowed
/// by the control plane; pick different service names.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Rule management
        .route("/faultline/v1/rules/add", post(handlers::rules::add_rule))
        .route(
            "/faultline/v1/rules/remove",
            post(handlers::rules::remove_rules),
        )
        .route("/faultline/v1/rules/list", get(handlers::rules::list_rules))
        .route("/faultline/v1/rules", delete(handlers::rules::reset_rules))
        // Everything else is proxied
        .fallback(handlers::proxy::proxy_message)
        .with_state(state)
}
