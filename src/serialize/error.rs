use thiserror::Error;

/// Boxed error produced by a lazy query source
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while walking an entity graph.
///
/// All of these point at a broken entity declaration or a failed load and
/// are propagated to the caller.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("entity '{entity}' declares field '{field}' but does not provide it")]
    UndeclaredField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("lazy query failed to materialize: {0}")]
    Query(#[source] BoxError),

    #[error("entity nesting exceeds maximum depth {max_depth}")]
    DepthExceeded { max_depth: usize },
}
