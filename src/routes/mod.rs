//! HTTP routes

pub mod ebooks;
pub mod health;
pub mod objects;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::state::AppState;

/// Build the application router
///
/// Everything except the health check requires a bearer token.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/objects", get(objects::list_objects))
        .route("/api/ebooks/*path", get(ebooks::get_ebook_resource))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/api/health", get(health::health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
