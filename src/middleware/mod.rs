pub mod auth;
pub mod request_scope;
pub mod response;

pub use auth::{current_user_from_headers, require_user, require_user_or};
pub use request_scope::{request_scope_middleware, REQUEST_ID_HEADER};
pub use response::{ApiResponse, ApiResult};
