// handlers/health.rs - GET /health handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::context::{SessionBinder, SessionProvider};

/// GET /health - Report whether the session provider can hand out sessions
pub async fn health_get<P: SessionProvider>(State(binder): State<SessionBinder<P>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match binder.provider().health_check().await {
        Ok(_) => {
            let open_scopes = binder.open_scopes().await;
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "data": {
                        "status": "ok",
                        "timestamp": now,
                        "database": "ok",
                        "open_scopes": open_scopes
                    }
                })),
            )
        }
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
