use axum::http::HeaderMap;

use crate::auth::decode_token;
use crate::context::{current_user, CurrentUser};
use crate::error::ApiError;

/// Resolve the current user from an `Authorization: Bearer` header.
/// Missing or invalid tokens resolve to no user.
pub fn current_user_from_headers(headers: &HeaderMap) -> Option<CurrentUser> {
    let token = match extract_jwt_from_headers(headers) {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(msg) => {
            tracing::debug!("Ignoring authorization header: {}", msg);
            return None;
        }
    };

    match decode_token(&token) {
        Ok(claims) => Some(claims.into()),
        Err(e) => {
            tracing::debug!("Ignoring bearer token: {}", e);
            None
        }
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token".to_string()),
        Some(token) => Ok(Some(token.trim().to_string())),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

/// The current user of the active request scope, or 403 "Not Found"
pub fn require_user() -> Result<CurrentUser, ApiError> {
    require_user_or(ApiError::forbidden("Not Found"))
}

/// Like [`require_user`] with a caller-chosen rejection
pub fn require_user_or(rejection: ApiError) -> Result<CurrentUser, ApiError> {
    current_user().ok_or(rejection)
}
