//! The generic entity store.

use std::sync::Arc;

use formstore_core::error::CoreError;
use formstore_core::schema::Catalog;
use formstore_core::types::DbId;
use formstore_core::value::{FieldValues, Record, Value};

use crate::config::StoreConfig;
use crate::ddl::ensure_schema;
use crate::error::StoreResult;
use crate::repo::EntityRepo;
use crate::tx::StoreTx;
use crate::{create_pool, DbPool};

/// Create / read / search / update / delete over every entity in a catalog.
///
/// Cheap to clone: the pool and catalog are shared. There is no cache, so
/// every call sees the current persisted state. Reads borrow one pooled
/// connection for the duration of the call; writes run in their own
/// transaction.
#[derive(Clone)]
pub struct EntityStore {
    pool: DbPool,
    catalog: Arc<Catalog>,
}

impl EntityStore {
    /// Open the configured database and create any missing entity tables.
    pub async fn open(config: &StoreConfig, catalog: Catalog) -> StoreResult<Self> {
        let pool = create_pool(config).await?;
        Self::with_pool(pool, catalog).await
    }

    /// Serve `catalog` from an existing pool, creating missing tables.
    pub async fn with_pool(pool: DbPool, catalog: Catalog) -> StoreResult<Self> {
        ensure_schema(&pool, &catalog).await?;
        Ok(Self {
            pool,
            catalog: Arc::new(catalog),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Start a scoped transaction for a multi-step workflow.
    pub async fn begin(&self) -> StoreResult<StoreTx> {
        let tx = self.pool.begin().await?;
        Ok(StoreTx::new(tx, Arc::clone(&self.catalog)))
    }

    /// Validate and insert a record, returning it with its new id.
    pub async fn create(&self, entity: &str, values: &FieldValues) -> StoreResult<Record> {
        let mut tx = self.begin().await?;
        let record = tx.create(entity, values).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Every record of `entity` in insertion order.
    pub async fn read_all(&self, entity: &str) -> StoreResult<Vec<Record>> {
        let schema = self.catalog.get(entity)?;
        let mut conn = self.pool.acquire().await?;
        Ok(EntityRepo::list(&mut conn, schema).await?)
    }

    pub async fn read_by_id(&self, entity: &str, id: DbId) -> StoreResult<Record> {
        let schema = self.catalog.get(entity)?;
        let mut conn = self.pool.acquire().await?;
        EntityRepo::find_by_id(&mut conn, schema, id)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id).into())
    }

    /// Records matching every supplied field.
    ///
    /// Free-text fields match by case-sensitive substring; ids, numbers,
    /// dates, statuses, references and `exact` text match exactly. An empty
    /// predicate set returns every record.
    pub async fn search(&self, entity: &str, predicates: &FieldValues) -> StoreResult<Vec<Record>> {
        let schema = self.catalog.get(entity)?;
        let predicates = schema.prepare_predicates(predicates)?;
        let mut conn = self.pool.acquire().await?;
        Ok(EntityRepo::search(&mut conn, schema, &predicates).await?)
    }

    /// Records where `keyword` matches at least one of `fields`.
    ///
    /// Each field matches as in [`search`](Self::search); fields whose type
    /// cannot hold the keyword are ignored.
    pub async fn search_any(
        &self,
        entity: &str,
        fields: &[String],
        keyword: &str,
    ) -> StoreResult<Vec<Record>> {
        let schema = self.catalog.get(entity)?;
        let predicates = schema.prepare_keyword(fields, keyword)?;
        let mut conn = self.pool.acquire().await?;
        Ok(EntityRepo::search_any(&mut conn, schema, &predicates).await?)
    }

    /// Resolve a non-identifier key to exactly one record.
    pub async fn find_one_by(&self, entity: &str, field: &str, value: &Value) -> StoreResult<Record> {
        let mut tx = self.begin().await?;
        let record = tx.find_one_by(entity, field, value).await?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn count(&self, entity: &str) -> StoreResult<i64> {
        let schema = self.catalog.get(entity)?;
        let mut conn = self.pool.acquire().await?;
        Ok(EntityRepo::count(&mut conn, schema).await?)
    }

    /// Overwrite the supplied fields of record `id`.
    pub async fn update(&self, entity: &str, id: DbId, values: &FieldValues) -> StoreResult<Record> {
        let mut tx = self.begin().await?;
        let record = tx.update(entity, id, values).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Delete record `id`. Records referencing it are not touched.
    pub async fn delete(&self, entity: &str, id: DbId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        tx.delete(entity, id).await?;
        tx.commit().await
    }
}
