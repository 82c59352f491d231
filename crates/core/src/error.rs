use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A nested payload references a row the record does not own.
    #[error("{message}")]
    InvalidRelation {
        relation: &'static str,
        message: &'static str,
    },

    #[error("You do not have permission to access this {resource}")]
    PermissionDenied { resource: &'static str },

    /// Deliberately non-specific error for unauthenticated client lookups.
    #[error("An error occurred")]
    OccurredError,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
