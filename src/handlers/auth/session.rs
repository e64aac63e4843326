// handlers/auth/session.rs - GET {base}/api/session handler

use axum::extract::{Query, State};

use crate::api::{not_found_if_empty, render, FieldsQuery};
use crate::context::{SessionBinder, SessionProvider};
use crate::middleware::{require_user, ApiResponse, ApiResult};

/// GET /api/session - Describe the session bound to this request.
///
/// The first call in a request opens the session; it is released when the
/// response is produced. The description is serialized through the field
/// selector like any other entity.
pub async fn session_get<P: SessionProvider>(
    State(binder): State<SessionBinder<P>>,
    Query(query): Query<FieldsQuery>,
) -> ApiResult {
    require_user()?;

    let node = {
        let session = binder.session().await?;
        binder.provider().describe(&session).await?
    };

    let body = not_found_if_empty(render(&node, &[], &query)?)?;
    Ok(ApiResponse::success(body))
}
