use thiserror::Error;

/// Errors from request scopes and their bound sessions
#[derive(Debug, Error, Clone)]
pub enum ContextError {
    #[error("Failed to create session: {0}")]
    Create(String),

    #[error("Failed to release session: {0}")]
    Release(String),

    #[error("Session provider unavailable: {0}")]
    Unavailable(String),
}
