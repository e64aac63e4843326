use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::auth::current_user_from_headers;
use crate::context::{RequestId, ScopeData, SessionBinder, SessionProvider};
use crate::error::ApiError;

/// Response header carrying the request's scope identity
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that runs the rest of the request inside its own scope.
///
/// The scope carries a fresh [`RequestId`], the user resolved from the bearer
/// token, and the request method and path. Its session is released when the
/// response is produced, including when the handler failed.
pub async fn request_scope_middleware<P: SessionProvider>(
    State(binder): State<SessionBinder<P>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::new();
    let data = ScopeData::new(request_id)
        .with_user(current_user_from_headers(request.headers()))
        .with_value("method", request.method().as_str())
        .with_value("path", request.uri().path());

    tracing::debug!(
        request = %request_id,
        user = ?data.current_user.as_ref().map(|u| &u.name),
        "Opening request scope"
    );

    let result = binder
        .run(data, async move { Ok::<_, ApiError>(next.run(request).await) })
        .await;

    let mut response = result.unwrap_or_else(<ApiError as IntoResponse>::into_response);
    if let Ok(value) = request_id.to_string().parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
