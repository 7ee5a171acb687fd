//! Bearer-token authentication. Tokens are opaque; the session store maps
//! them to the caller's verified attributes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{AppState, errors::AppError};

/// Resolve the bearer token to an [`rounds_core::AuthContext`] and stash
/// it in request extensions. Rejects with 401 when the token is absent,
/// malformed, or unknown.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?;
    let ctx = state
        .sessions
        .lookup(&token)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid session token"))?;

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<String, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::unauthorized("missing authorization header")
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("expected bearer token"))?;
    if token.is_empty() {
        return Err(AppError::unauthorized("empty bearer token"));
    }
    Ok(token.to_string())
}
