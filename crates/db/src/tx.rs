//! Scoped transactions over the entity store.
//!
//! A [`StoreTx`] owns one pooled connection inside an open SQLite
//! transaction for its whole lifetime. `commit` makes its writes durable;
//! dropping it on any other path (including `?` on an error) rolls back.

use std::sync::Arc;

use formstore_core::error::CoreError;
use formstore_core::schema::{Catalog, FieldKind, MatchMode, Predicate};
use formstore_core::types::DbId;
use formstore_core::value::{FieldValues, Record, Value};
use sqlx::{Sqlite, Transaction};

use crate::error::StoreResult;
use crate::repo::EntityRepo;

pub struct StoreTx {
    tx: Transaction<'static, Sqlite>,
    catalog: Arc<Catalog>,
}

impl StoreTx {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>, catalog: Arc<Catalog>) -> Self {
        Self { tx, catalog }
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    pub async fn create(&mut self, entity: &str, values: &FieldValues) -> StoreResult<Record> {
        let schema = self.catalog.get(entity)?;
        let prepared = schema.prepare_create(values)?;
        let record = EntityRepo::insert(&mut self.tx, schema, &prepared).await?;
        tracing::debug!(entity, id = record.id, "Created record");
        Ok(record)
    }

    pub async fn read_all(&mut self, entity: &str) -> StoreResult<Vec<Record>> {
        let schema = self.catalog.get(entity)?;
        Ok(EntityRepo::list(&mut self.tx, schema).await?)
    }

    pub async fn read_by_id(&mut self, entity: &str, id: DbId) -> StoreResult<Record> {
        let schema = self.catalog.get(entity)?;
        EntityRepo::find_by_id(&mut self.tx, schema, id)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id).into())
    }

    pub async fn search(
        &mut self,
        entity: &str,
        predicates: &FieldValues,
    ) -> StoreResult<Vec<Record>> {
        let schema = self.catalog.get(entity)?;
        let predicates = schema.prepare_predicates(predicates)?;
        Ok(EntityRepo::search(&mut self.tx, schema, &predicates).await?)
    }

    /// Resolve a non-identifier key (such as a name) to exactly one record.
    ///
    /// Zero matches is `NotFound`; more than one is `Conflict`, so callers
    /// never mutate an arbitrary member of a set of duplicates.
    pub async fn find_one_by(
        &mut self,
        entity: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Record> {
        let schema = self.catalog.get(entity)?;
        let field_def = schema.require_field(field)?;
        let predicate = Predicate {
            column: field_def.name.clone(),
            value: field_def.coerce(value)?,
            mode: MatchMode::Exact,
        };
        let mut matches = EntityRepo::search(&mut self.tx, schema, &[predicate]).await?;
        match matches.len() {
            0 => Err(CoreError::not_found_by(entity, field, value).into()),
            1 => Ok(matches.remove(0)),
            n => Err(CoreError::Conflict(format!(
                "{n} {entity} records have {field} = {value}; select one by id"
            ))
            .into()),
        }
    }

    pub async fn count(&mut self, entity: &str) -> StoreResult<i64> {
        let schema = self.catalog.get(entity)?;
        Ok(EntityRepo::count(&mut self.tx, schema).await?)
    }

    /// Overwrite the supplied fields, leaving the rest unchanged.
    pub async fn update(
        &mut self,
        entity: &str,
        id: DbId,
        values: &FieldValues,
    ) -> StoreResult<Record> {
        let schema = self.catalog.get(entity)?;
        let prepared = schema.prepare_update(values)?;
        if prepared.is_empty() {
            return self.read_by_id(entity, id).await;
        }

        if let Some(record) = EntityRepo::update(&mut self.tx, schema, id, &prepared).await? {
            tracing::debug!(entity, id, fields = prepared.len(), "Updated record");
            return Ok(record);
        }

        // No row matched: either the id is missing or a status transition
        // was refused by the guard.
        let current = EntityRepo::find_by_id(&mut self.tx, schema, id)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id))?;
        for (name, next) in &prepared {
            let (Some(field), Value::Text(next)) = (schema.get_field(name), next) else {
                continue;
            };
            if let (FieldKind::Status(machine), Some(Value::Text(now))) =
                (&field.kind, current.get(name))
            {
                machine.validate_transition(name, now, next)?;
            }
        }
        Err(CoreError::Conflict(format!("Update of {entity} id {id} did not apply")).into())
    }

    /// Remove a record. Dependent records are left in place.
    pub async fn delete(&mut self, entity: &str, id: DbId) -> StoreResult<()> {
        let schema = self.catalog.get(entity)?;
        if !EntityRepo::delete(&mut self.tx, schema, id).await? {
            return Err(CoreError::not_found(entity, id).into());
        }
        tracing::debug!(entity, id, "Deleted record");
        Ok(())
    }

    /// Atomically subtract `amount` from `field` if enough is available.
    ///
    /// Fails with `Conflict` when the stored value is below `amount`.
    pub async fn decrement_guarded(
        &mut self,
        entity: &str,
        id: DbId,
        field: &str,
        amount: &Value,
    ) -> StoreResult<Value> {
        let schema = self.catalog.get(entity)?;
        let field_def = schema.require_numeric_field(field)?;
        let amount = positive_amount(field_def.coerce(amount)?, field)?;
        if let Some(value) =
            EntityRepo::decrement_guarded(&mut self.tx, schema, id, field_def, &amount).await?
        {
            return Ok(value);
        }
        if !EntityRepo::exists(&mut self.tx, schema, id).await? {
            return Err(CoreError::not_found(entity, id).into());
        }
        tracing::warn!(entity, id, field, %amount, "Insufficient quantity");
        Err(CoreError::Conflict(format!("Insufficient {field} on {entity} id {id}")).into())
    }

    /// Atomically add `amount` (which may be negative) to `field`.
    pub async fn increment(
        &mut self,
        entity: &str,
        id: DbId,
        field: &str,
        amount: &Value,
    ) -> StoreResult<Value> {
        let schema = self.catalog.get(entity)?;
        let field_def = schema.require_numeric_field(field)?;
        let amount = field_def.coerce(amount)?;
        if amount.is_null() {
            return Err(CoreError::Validation(format!("{field} amount is required")).into());
        }
        EntityRepo::increment(&mut self.tx, schema, id, field_def, &amount)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id).into())
    }

    /// Flip an integer flag from unset to 1 exactly once.
    ///
    /// Fails with `Conflict` if the flag is already set.
    pub async fn claim_flag(&mut self, entity: &str, id: DbId, field: &str) -> StoreResult<()> {
        let schema = self.catalog.get(entity)?;
        let field_def = schema.require_field(field)?;
        if field_def.kind != FieldKind::Integer {
            return Err(
                CoreError::Validation(format!("{entity}.{field} is not an integer flag")).into(),
            );
        }
        if EntityRepo::claim_flag(&mut self.tx, schema, id, field_def).await? {
            return Ok(());
        }
        if !EntityRepo::exists(&mut self.tx, schema, id).await? {
            return Err(CoreError::not_found(entity, id).into());
        }
        Err(CoreError::Conflict(format!("{entity} id {id} has already used {field}")).into())
    }
}

fn positive_amount(amount: Value, field: &str) -> Result<Value, CoreError> {
    match amount.as_real() {
        Some(v) if v > 0.0 => Ok(amount),
        _ => Err(CoreError::Validation(format!(
            "{field} amount must be a positive number"
        ))),
    }
}
