//! Helpers shared by the dynamic query builders.

use formstore_core::schema::{EntitySchema, FieldKind, ID_COLUMN};
use formstore_core::value::{Record, Value};
use indexmap::IndexMap;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

/// Quote a table or column name. Names are validated identifiers, so no
/// escaping is needed.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

/// Append `value` as a bound parameter (or a `NULL` literal).
pub(crate) fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Null => qb.push("NULL"),
        Value::Integer(v) => qb.push_bind(*v),
        Value::Real(v) => qb.push_bind(*v),
        Value::Text(v) => qb.push_bind(v.clone()),
    };
}

/// Read one column as the value type its field kind stores.
pub(crate) fn decode_value(
    row: &SqliteRow,
    column: &str,
    kind: &FieldKind,
) -> Result<Value, sqlx::Error> {
    let value = match kind {
        FieldKind::Integer => row.try_get::<Option<i64>, _>(column)?.map(Value::Integer),
        FieldKind::Real => row.try_get::<Option<f64>, _>(column)?.map(Value::Real),
        FieldKind::Text | FieldKind::Date | FieldKind::Status(_) => {
            row.try_get::<Option<String>, _>(column)?.map(Value::Text)
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Decode a full `SELECT *` / `RETURNING *` row.
pub(crate) fn decode_record(row: &SqliteRow, schema: &EntitySchema) -> Result<Record, sqlx::Error> {
    let id = row.try_get::<i64, _>(ID_COLUMN)?;
    let mut fields = IndexMap::with_capacity(schema.fields.len());
    for field in &schema.fields {
        fields.insert(
            field.name.clone(),
            decode_value(row, &field.name, &field.kind)?,
        );
    }
    Ok(Record { id, fields })
}
