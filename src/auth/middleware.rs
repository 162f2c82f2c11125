//! Bearer token middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Reject requests without a valid bearer token
///
/// The validated [`UserIdentity`](super::UserIdentity) is stored in the
/// request extensions for handlers that need it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid Authorization header".to_string()))?;

    let identity = state
        .validator()
        .validate(&token)
        .await
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    tracing::debug!("Authenticated request from {}", identity.login);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
