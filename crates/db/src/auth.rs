//! Login against the `user` entity.
//!
//! Users are ordinary records: a unique username, a SHA-256 password hash
//! and a free-form role string. Login is a search on username and hash.
//! There are no sessions; an [`AuthenticatedUser`] lives as long as the
//! caller keeps it.

use formstore_core::error::CoreError;
use formstore_core::hashing::hash_password;
use formstore_core::schema::{EntitySchema, FieldDef};
use formstore_core::types::DbId;
use formstore_core::validation::validate_non_empty;
use formstore_core::value::{field_values, Record};
use serde::Serialize;

use crate::error::StoreResult;
use crate::store::EntityStore;

pub const USER_ENTITY: &str = "user";

/// Schema of the `user` entity. Add it to a catalog to enable login.
pub fn user_schema() -> EntitySchema {
    EntitySchema::new(USER_ENTITY)
        .field(FieldDef::text("username").required().unique().exact())
        .field(FieldDef::text("password_hash").required().exact())
        .field(FieldDef::text("role").required().exact())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: DbId,
    pub username: String,
    pub role: String,
}

impl AuthenticatedUser {
    fn from_record(record: &Record) -> Result<Self, CoreError> {
        let text = |field: &str| {
            record
                .text(field)
                .map(str::to_string)
                .ok_or_else(|| CoreError::Internal(format!("user {} has no {field}", record.id)))
        };
        Ok(Self {
            id: record.id,
            username: text("username")?,
            role: text("role")?,
        })
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Fail with `Forbidden` unless the user's role is exactly `role`.
    pub fn require_role(&self, role: &str) -> Result<(), CoreError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "{} has role '{}', '{role}' required",
                self.username, self.role
            )))
        }
    }
}

/// Create a user. A taken username is `Conflict`.
pub async fn register(
    store: &EntityStore,
    username: &str,
    password: &str,
    role: &str,
) -> StoreResult<AuthenticatedUser> {
    validate_non_empty("password", password)?;
    let record = store
        .create(
            USER_ENTITY,
            &field_values([
                ("username", username.to_string()),
                ("password_hash", hash_password(password)),
                ("role", role.to_string()),
            ]),
        )
        .await?;
    tracing::info!(user_id = record.id, username, role, "User registered");
    Ok(AuthenticatedUser::from_record(&record)?)
}

/// Check credentials. Unknown users and wrong passwords are both
/// `Unauthorized` with the same message.
pub async fn login(
    store: &EntityStore,
    username: &str,
    password: &str,
) -> StoreResult<AuthenticatedUser> {
    let matches = store
        .search(
            USER_ENTITY,
            &field_values([
                ("username", username.to_string()),
                ("password_hash", hash_password(password)),
            ]),
        )
        .await?;
    match matches.first() {
        Some(record) => {
            tracing::info!(user_id = record.id, username, "Login succeeded");
            Ok(AuthenticatedUser::from_record(record)?)
        }
        None => {
            tracing::warn!(username, "Login failed");
            Err(CoreError::Unauthorized("Invalid username or password".into()).into())
        }
    }
}
