// handlers/auth/whoami.rs - GET {base}/api/whoami handler

use axum::extract::Query;
use serde_json::json;

use crate::api::{not_found_if_empty, render, FieldsQuery};
use crate::context::current_scope;
use crate::middleware::{require_user, ApiResponse, ApiResult};
use crate::serialize::Node;

/// GET /api/whoami - Describe the authenticated caller and its request scope.
///
/// The user is serialized through the field selector, so `?fields=^name`
/// narrows it and `?private=true` reveals the access level. A selection that
/// leaves no user field is a 404.
pub async fn whoami_get(Query(query): Query<FieldsQuery>) -> ApiResult {
    let user = require_user()?;
    let scope = current_scope();

    let user = not_found_if_empty(render(&Node::entity(user), &[], &query)?)?;

    Ok(ApiResponse::success(json!({
        "request": scope.request.map(|id| id.to_string()),
        "path": scope.value("path"),
        "user": user,
    })))
}
