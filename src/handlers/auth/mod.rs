// handlers/auth/mod.rs - Auth handler module

pub mod session; // GET /api/session
pub mod token; // POST /api/auth/token
pub mod whoami; // GET /api/whoami

pub use session::session_get;
pub use token::token_post;
pub use whoami::whoami_get;
