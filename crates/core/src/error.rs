use crate::types::DbId;

/// Domain error taxonomy for the exchange engine.
///
/// Every engine-level failure maps to exactly one of these kinds. The
/// distinction between [`Conflict`](CoreError::Conflict) and
/// [`InvalidTransition`](CoreError::InvalidTransition) matters to callers:
/// a conflict means the caller's view of the world was stale (retry after
/// refreshing is legitimate), while an invalid transition means the
/// requested operation is not permitted from the entity's current state.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid state transition: {entity} is {status}")]
    InvalidTransition { entity: &'static str, status: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violated: {0}")]
    BusinessRule(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
