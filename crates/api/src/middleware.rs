use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use kycflow_auth::Hs256Tokens;

use crate::app::errors;
use crate::context::AuthContext;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<Hs256Tokens>,
}

/// Validates the bearer token and attaches an [`AuthContext`] to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| errors::json_error(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    let claims = state
        .tokens
        .validate(token)
        .map_err(|_| errors::json_error(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

    req.extensions_mut()
        .insert(AuthContext::new(claims.sub, claims.username, claims.role));

    Ok(next.run(req).await)
}

/// Rejects non-admin callers. Must run after [`auth_middleware`].
pub async fn require_admin(
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let is_admin = req
        .extensions()
        .get::<AuthContext>()
        .is_some_and(|ctx| ctx.role().is_admin());
    if !is_admin {
        return Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "Admin access required",
        ));
    }
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}
