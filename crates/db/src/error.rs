use formstore_core::error::CoreError;

/// Error type for every store operation.
///
/// Domain failures (validation, not-found, conflict, auth) arrive as
/// [`CoreError`]; anything else the database reports stays a `sqlx::Error`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            StoreError::Core(core) => Some(core),
            StoreError::Database(_) => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        classify_sqlx_error(err)
    }
}

/// `SQLITE_BUSY`, `SQLITE_BUSY_RECOVERY`, `SQLITE_BUSY_SNAPSHOT`.
const SQLITE_BUSY_CODES: [&str; 3] = ["5", "261", "517"];

/// Classify a sqlx error into a domain error where one applies.
///
/// - Unique constraint violations map to `Conflict`.
/// - Foreign key violations (only raised when enforcement is on) map to `Conflict`.
/// - NOT NULL violations map to `Validation`.
/// - Lock contention (`SQLITE_BUSY` and its extended codes) maps to
///   `Conflict`: another writer got there first and the caller may retry.
/// - Everything else stays a database error.
pub fn classify_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Core(CoreError::Conflict(format!(
                "Duplicate value violates unique constraint: {}",
                db_err.message()
            )));
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::Core(CoreError::Conflict(format!(
                "Reference constraint failed: {}",
                db_err.message()
            )));
        }
        if matches!(db_err.kind(), sqlx::error::ErrorKind::NotNullViolation) {
            return StoreError::Core(CoreError::Validation(db_err.message().to_string()));
        }
        if let Some(code) = db_err.code().as_deref().filter(|c| SQLITE_BUSY_CODES.contains(c)) {
            tracing::warn!(code, "Write lost to a concurrent transaction");
            return StoreError::Core(CoreError::Conflict(
                "The record was changed by another writer; retry the operation".into(),
            ));
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Database(err)
}
