use std::path::Path;

use anyhow::Context;
use formstore_core::schema::Catalog;
use formstore_db::auth::{user_schema, USER_ENTITY};

/// Read a catalog file. The `user` entity is added when the file does not
/// declare one, so every store supports login.
pub fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let catalog = Catalog::from_json(&json)
        .with_context(|| format!("Invalid catalog {}", path.display()))?;
    with_users(catalog)
}

pub fn with_users(catalog: Catalog) -> anyhow::Result<Catalog> {
    if catalog.contains(USER_ENTITY) {
        return Ok(catalog);
    }
    Ok(catalog.with(user_schema())?)
}
