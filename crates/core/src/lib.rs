//! Pure domain logic for the generic entity store: identifiers, values,
//! schemas, validation and status machines. Nothing here touches storage.

pub mod error;
pub mod hashing;
pub mod roles;
pub mod schema;
pub mod status;
pub mod types;
pub mod validation;
pub mod value;
