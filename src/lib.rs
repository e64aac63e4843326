pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod selector;
pub mod serialize;

pub use context::{SessionBinder, SessionProvider};
pub use handlers::app;
pub use selector::{FieldDef, FieldKind, FieldSelector, Visibility};
pub use serialize::{Entity, Node, SerializeError, Serializer};
