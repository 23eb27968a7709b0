//! Table definitions derived from entity schemas.

use formstore_core::schema::{Catalog, EntitySchema, ID_COLUMN};

use crate::sql::quote_ident;
use crate::DbPool;

/// `CREATE TABLE IF NOT EXISTS` statement for one entity.
///
/// The identifier is `AUTOINCREMENT` so ids are never reused after a
/// delete. References are declared but only checked when the connection
/// enables foreign keys.
pub fn create_table_sql(schema: &EntitySchema) -> String {
    let mut columns = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_ident(ID_COLUMN)
    )];
    for field in &schema.fields {
        let mut column = format!("{} {}", quote_ident(&field.name), field.kind.sql_type());
        if field.required {
            column.push_str(" NOT NULL");
        }
        if field.unique {
            column.push_str(" UNIQUE");
        }
        if let Some(target) = &field.references {
            column.push_str(&format!(
                " REFERENCES {}({})",
                quote_ident(target),
                quote_ident(ID_COLUMN)
            ));
        }
        columns.push(column);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&schema.name),
        columns.join(", ")
    )
}

/// Create every catalog table that does not exist yet, in one transaction.
pub async fn ensure_schema(pool: &DbPool, catalog: &Catalog) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for schema in catalog.iter() {
        sqlx::query(&create_table_sql(schema))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    tracing::info!(entities = catalog.len(), "Entity tables ready");
    Ok(())
}
