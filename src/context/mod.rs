//! Request-scoped context and session binding.
//!
//! Each logical request runs inside a scope stored in tokio task-local
//! storage, so concurrent requests on the same worker thread never see each
//! other's data. Work moved onto other tasks or blocking threads carries the
//! scope explicitly via [`spawn_scoped`] and [`spawn_blocking_scoped`].

pub mod error;
pub mod scope;
pub mod session;

pub use error::ContextError;
pub use scope::{
    current_scope, current_user, scope_key, scoped, scoped_sync, spawn_blocking_scoped,
    spawn_scoped, CurrentUser, RequestId, ScopeData,
};
pub use session::{ScopeKey, SessionBinder, SessionProvider};
