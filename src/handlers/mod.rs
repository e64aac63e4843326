// handlers/mod.rs - Router assembly
//
// Public routes sit at the root; API routes are mounted beneath the
// configured base prefix. Every request runs inside its own request scope.

pub mod auth;
pub mod health;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::context::{SessionBinder, SessionProvider};
use crate::middleware::request_scope_middleware;

pub use auth::{session_get, token_post, whoami_get};
pub use health::health_get;

/// Build the application router.
///
/// `base` is a normalized prefix (`""` or `"/app"`) under which the API
/// routes are mounted. Handlers reach the per-request session through the
/// binder held in router state.
pub fn app<P: SessionProvider>(binder: SessionBinder<P>, base: &str) -> Router {
    let api = api_routes::<P>();
    let api = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    Router::new()
        .route("/health", get(health_get::<P>))
        .merge(api)
        .with_state(binder.clone())
        .layer(from_fn_with_state(binder, request_scope_middleware::<P>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes<P: SessionProvider>() -> Router<SessionBinder<P>> {
    Router::new()
        .route("/api/whoami", get(whoami_get))
        .route("/api/session", get(session_get::<P>))
        .route("/api/auth/token", post(token_post))
}
