//! Repository for entity tables.
//!
//! `EntityRepo` is a zero-sized struct providing async CRUD methods that
//! accept a borrowed connection and the entity's schema. Callers decide
//! whether that connection is a plain pooled connection or a transaction.
//! Values passed in are expected to be prepared by the schema already.

use formstore_core::schema::{EntitySchema, FieldDef, FieldKind, MatchMode, Predicate, ID_COLUMN};
use formstore_core::types::DbId;
use formstore_core::value::{FieldValues, Record, Value};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::sql::{decode_record, decode_value, push_value, quote_ident};

/// Provides CRUD operations for any catalog entity.
pub struct EntityRepo;

impl EntityRepo {
    /// Insert a row, returning the stored record.
    pub async fn insert(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        values: &FieldValues,
    ) -> Result<Record, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} ", quote_ident(&schema.name)));
        if values.is_empty() {
            qb.push("DEFAULT VALUES");
        } else {
            let columns: Vec<String> = values.keys().map(|name| quote_ident(name)).collect();
            qb.push(format!("({}) VALUES (", columns.join(", ")));
            for (i, value) in values.values().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(&mut qb, value);
            }
            qb.push(")");
        }
        qb.push(" RETURNING *");

        let row = qb.build().fetch_one(&mut *conn).await?;
        decode_record(&row, schema)
    }

    /// Find a record by its identifier.
    pub async fn find_by_id(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        id: DbId,
    ) -> Result<Option<Record>, sqlx::Error> {
        let query = format!(
            "SELECT * FROM {} WHERE {} = ?",
            quote_ident(&schema.name),
            quote_ident(ID_COLUMN)
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|row| decode_record(&row, schema)).transpose()
    }

    /// Whether a record with this identifier exists.
    pub async fn exists(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
            quote_ident(&schema.name),
            quote_ident(ID_COLUMN)
        );
        let hit: Option<i64> = sqlx::query_scalar(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(hit.is_some())
    }

    /// List all records in insertion order.
    pub async fn list(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
    ) -> Result<Vec<Record>, sqlx::Error> {
        Self::search(conn, schema, &[]).await
    }

    /// List records matching every predicate, in insertion order.
    ///
    /// `Contains` predicates use `instr`, which is case-sensitive, unlike
    /// SQLite's `LIKE`.
    pub async fn search(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        predicates: &[Predicate],
    ) -> Result<Vec<Record>, sqlx::Error> {
        Self::select_where(conn, schema, predicates, " AND ").await
    }

    /// List records matching at least one predicate, in insertion order.
    /// No predicates matches nothing.
    pub async fn search_any(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        predicates: &[Predicate],
    ) -> Result<Vec<Record>, sqlx::Error> {
        if predicates.is_empty() {
            return Ok(Vec::new());
        }
        Self::select_where(conn, schema, predicates, " OR ").await
    }

    async fn select_where(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        predicates: &[Predicate],
        joiner: &str,
    ) -> Result<Vec<Record>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", quote_ident(&schema.name)));
        for (i, predicate) in predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { joiner });
            let column = quote_ident(&predicate.column);
            match (&predicate.value, predicate.mode) {
                (Value::Null, _) => {
                    qb.push(format!("{column} IS NULL"));
                }
                (value, MatchMode::Exact) => {
                    qb.push(format!("{column} = "));
                    push_value(&mut qb, value);
                }
                (value, MatchMode::Contains) => {
                    qb.push(format!("instr({column}, "));
                    push_value(&mut qb, value);
                    qb.push(") > 0");
                }
            }
        }
        qb.push(format!(" ORDER BY {}", quote_ident(ID_COLUMN)));

        let rows = qb.build().fetch_all(&mut *conn).await?;
        rows.iter().map(|row| decode_record(row, schema)).collect()
    }

    /// Count all records.
    pub async fn count(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_ident(&schema.name));
        sqlx::query_scalar(&query).fetch_one(&mut *conn).await
    }

    /// Update the supplied fields of a record.
    ///
    /// Status fields only change when the stored state may transition to the
    /// new one; otherwise no row matches. A `NULL` stored state matches no
    /// transition. Returns `None` if no row was
    /// updated (missing id or refused transition).
    pub async fn update(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        id: DbId,
        values: &FieldValues,
    ) -> Result<Option<Record>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", quote_ident(&schema.name)));
        for (i, (name, value)) in values.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(format!("{} = ", quote_ident(name)));
            push_value(&mut qb, value);
        }
        qb.push(format!(" WHERE {} = ", quote_ident(ID_COLUMN)));
        qb.push_bind(id);

        for (name, value) in values {
            let (Some(field), Value::Text(next)) = (schema.get_field(name), value) else {
                continue;
            };
            let FieldKind::Status(machine) = &field.kind else {
                continue;
            };
            let column = quote_ident(name);
            qb.push(format!(" AND {column} IN ("));
            for (i, state) in machine.predecessors_of(next).into_iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push_bind(state.to_string());
            }
            qb.push(")");
        }
        qb.push(" RETURNING *");

        let row = qb.build().fetch_optional(&mut *conn).await?;
        row.map(|row| decode_record(&row, schema)).transpose()
    }

    /// Delete a record. Returns `true` if a row was removed.
    pub async fn delete(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(&schema.name),
            quote_ident(ID_COLUMN)
        );
        let result = sqlx::query(&query).bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Subtract `amount` from a numeric field only if the stored value is at
    /// least `amount`. Returns the new value, or `None` when no row matched.
    pub async fn decrement_guarded(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        id: DbId,
        field: &FieldDef,
        amount: &Value,
    ) -> Result<Option<Value>, sqlx::Error> {
        let column = quote_ident(&field.name);
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "UPDATE {} SET {column} = {column} - ",
            quote_ident(&schema.name)
        ));
        push_value(&mut qb, amount);
        qb.push(format!(" WHERE {} = ", quote_ident(ID_COLUMN)));
        qb.push_bind(id);
        qb.push(format!(" AND {column} >= "));
        push_value(&mut qb, amount);
        qb.push(format!(" RETURNING {column}"));

        let row = qb.build().fetch_optional(&mut *conn).await?;
        row.map(|row| decode_value(&row, &field.name, &field.kind))
            .transpose()
    }

    /// Add `amount` to a numeric field, treating `NULL` as zero.
    pub async fn increment(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        id: DbId,
        field: &FieldDef,
        amount: &Value,
    ) -> Result<Option<Value>, sqlx::Error> {
        let column = quote_ident(&field.name);
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "UPDATE {} SET {column} = COALESCE({column}, 0) + ",
            quote_ident(&schema.name)
        ));
        push_value(&mut qb, amount);
        qb.push(format!(" WHERE {} = ", quote_ident(ID_COLUMN)));
        qb.push_bind(id);
        qb.push(format!(" RETURNING {column}"));

        let row = qb.build().fetch_optional(&mut *conn).await?;
        row.map(|row| decode_value(&row, &field.name, &field.kind))
            .transpose()
    }

    /// Set an integer flag from 0/`NULL` to 1. Returns `true` if this call
    /// flipped it.
    pub async fn claim_flag(
        conn: &mut SqliteConnection,
        schema: &EntitySchema,
        id: DbId,
        field: &FieldDef,
    ) -> Result<bool, sqlx::Error> {
        let column = quote_ident(&field.name);
        let query = format!(
            "UPDATE {} SET {column} = 1 WHERE {} = ? AND COALESCE({column}, 0) = 0",
            quote_ident(&schema.name),
            quote_ident(ID_COLUMN)
        );
        let result = sqlx::query(&query).bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }
}
