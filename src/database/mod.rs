pub mod manager;
pub mod session;

pub use manager::{DatabaseError, DatabaseManager};
pub use session::{PgSession, PgSessionProvider};
