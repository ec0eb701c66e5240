use actix_web::{http::header, HttpRequest};

use crate::errors::AppError;
use crate::repositories::{Principal, Role};
use crate::state::AppState;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Caller identity for endpoints where authentication is optional. Missing,
/// unknown or unverifiable credentials all mean anonymous.
pub(crate) async fn optional_principal(state: &AppState, req: &HttpRequest) -> Option<Principal> {
    let token = bearer_token(req)?;
    match state.principals.verify(token).await {
        Ok(principal) => principal,
        Err(err) => {
            log::warn!("token verification failed, continuing anonymously: {err}");
            None
        }
    }
}

pub(crate) async fn require_principal(state: &AppState, req: &HttpRequest) -> Result<Principal, AppError> {
    let token = bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    state
        .principals
        .verify(token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid or expired token".into()))
}

pub(crate) async fn require_admin(state: &AppState, req: &HttpRequest) -> Result<Principal, AppError> {
    let principal = require_principal(state, req).await?;
    if principal.role != Role::Admin {
        return Err(AppError::Unauthorized("admin role required".into()));
    }
    Ok(principal)
}
