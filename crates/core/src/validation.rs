//! Field-level validation helpers: pure functions, no storage access.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::CoreError;

/// Canonical date format accepted by date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid regex"));

/// Parse a `YYYY-MM-DD` date, rejecting other layouts and impossible dates.
///
/// ```
/// use formstore_core::validation::validate_date;
///
/// assert!(validate_date("2023-10-01").is_ok());
/// assert!(validate_date("01-10-2023").is_err());
/// assert!(validate_date("2023-13-01").is_err());
/// ```
pub fn validate_date(input: &str) -> Result<NaiveDate, CoreError> {
    if !DATE_RE.is_match(input) {
        return Err(CoreError::Validation(format!(
            "Invalid date '{input}'. Expected YYYY-MM-DD"
        )));
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| CoreError::Validation(format!("Invalid date '{input}'. No such day")))
}

pub fn is_valid_date(input: &str) -> bool {
    validate_date(input).is_ok()
}

/// Whole days `returned` is past `due`; zero when on time or early.
pub fn days_overdue(due: NaiveDate, returned: NaiveDate) -> i64 {
    (returned - due).num_days().max(0)
}

/// Reject a required text value that is empty after trimming.
pub fn validate_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Validate a table or column name before it is interpolated into SQL.
pub fn validate_identifier(kind: &str, name: &str) -> Result<(), CoreError> {
    if !IDENTIFIER_RE.is_match(name) {
        return Err(CoreError::Validation(format!(
            "Invalid {kind} name '{name}'. Use lowercase letters, digits and underscores, starting with a letter"
        )));
    }
    if name.starts_with("sqlite_") {
        return Err(CoreError::Validation(format!(
            "Invalid {kind} name '{name}'. The sqlite_ prefix is reserved"
        )));
    }
    Ok(())
}
