use tradepost_core::error::CoreError;

/// Engine-level error type.
///
/// Wraps [`CoreError`] for domain failures and adds the database variant.
/// Every engine operation fails fast with exactly one of these; nothing is
/// swallowed at the engine boundary. The presentation layer maps kinds to
/// its own status-code convention.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error from `tradepost_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for engine operation return values.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// The wrapped domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(core) => Some(core),
            EngineError::Database(_) => None,
        }
    }
}
