use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `NotFound` for an identifier lookup.
    pub fn not_found(entity: &str, id: DbId) -> Self {
        CoreError::NotFound {
            entity: entity.to_string(),
            key: format!("id {id}"),
        }
    }

    /// `NotFound` for a lookup keyed by a non-identifier field.
    pub fn not_found_by(entity: &str, field: &str, value: impl std::fmt::Display) -> Self {
        CoreError::NotFound {
            entity: entity.to_string(),
            key: format!("{field} = {value}"),
        }
    }
}
