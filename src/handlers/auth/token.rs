// handlers/auth/token.rs - POST {base}/api/auth/token handler

use axum::{extract::rejection::JsonRejection, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::require_json_fields;
use crate::auth::issue_token;
use crate::context::CurrentUser;
use crate::error::ApiError;
use crate::is_development;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /api/auth/token - Sign a bearer token for the given user.
///
/// Expected input:
/// ```json
/// { "user_id": "uuid", "name": "string", "access": "string" }
/// ```
///
/// Only served in development; other environments answer 403.
pub async fn token_post(body: Result<Json<Value>, JsonRejection>) -> ApiResult {
    if !is_development!() {
        return Err(ApiError::forbidden("Not Found"));
    }
    let Json(body) = body.map_err(|rejection| ApiError::invalid_json(rejection.body_text()))?;

    let fields = require_json_fields(&body, &["user_id", "name", "access"])?;

    let id = fields
        .get("user_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ApiError::bad_request("Field 'user_id' must be a UUID string."))?;
    let name = string_field(fields, "name")?;
    let access = string_field(fields, "access")?;

    let user = CurrentUser { id, name, access };
    let token = issue_token(&user)?;
    tracing::info!(user = %user.name, "Issued bearer token");

    Ok(ApiResponse::created(json!({
        "token": token,
        "expires_in": crate::config::config().security.jwt_expiry_hours * 3600,
    })))
}

fn string_field(fields: &serde_json::Map<String, Value>, name: &str) -> Result<String, ApiError> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(format!("Field '{}' must be a string.", name)))
}
