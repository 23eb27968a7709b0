//! Multi-step workflows that must not interleave.
//!
//! Each workflow runs in one [`StoreTx`](crate::tx::StoreTx) whose first
//! statement is the guarded write. Concurrent callers therefore queue on
//! SQLite's write lock and the later one sees the earlier one's committed
//! result: it fails with `Conflict` instead of overselling stock or counting
//! a second vote.

use formstore_core::types::DbId;
use formstore_core::value::{FieldValues, Record, Value};

use crate::error::StoreResult;
use crate::store::EntityStore;

/// Take `quantity` units from a source record and record the take.
///
/// e.g. decrement `product.stock` and insert an `order_item`.
#[derive(Debug, Clone)]
pub struct StockReservation {
    pub source_entity: String,
    pub source_id: DbId,
    pub quantity_field: String,
    pub quantity: i64,
    pub record_entity: String,
    pub record_fields: FieldValues,
}

/// Use a one-time flag, record the use, and bump a tally.
///
/// e.g. set `voter.has_voted`, insert a `vote`, increment
/// `candidate.vote_count`.
#[derive(Debug, Clone)]
pub struct SingleUseClaim {
    pub claimant_entity: String,
    pub claimant_id: DbId,
    pub flag_field: String,
    pub record_entity: String,
    pub record_fields: FieldValues,
    pub tally_entity: String,
    pub tally_id: DbId,
    pub tally_field: String,
}

/// Outcome of a committed [`reserve_stock`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reserved {
    pub remaining: Value,
    pub record: Record,
}

/// Decrement stock and insert the dependent record atomically.
///
/// Fails with `Conflict` when fewer than `quantity` units remain; nothing is
/// written in that case.
pub async fn reserve_stock(store: &EntityStore, req: &StockReservation) -> StoreResult<Reserved> {
    let mut tx = store.begin().await?;
    let remaining = tx
        .decrement_guarded(
            &req.source_entity,
            req.source_id,
            &req.quantity_field,
            &Value::Integer(req.quantity),
        )
        .await?;
    let record = tx.create(&req.record_entity, &req.record_fields).await?;
    tx.commit().await?;

    tracing::info!(
        source = %req.source_entity,
        source_id = req.source_id,
        quantity = req.quantity,
        record_id = record.id,
        "Stock reserved"
    );
    Ok(Reserved { remaining, record })
}

/// Claim the flag, insert the record and bump the tally atomically.
///
/// Fails with `Conflict` when the flag was already claimed; nothing is
/// written in that case.
pub async fn claim_once(store: &EntityStore, req: &SingleUseClaim) -> StoreResult<Record> {
    let mut tx = store.begin().await?;
    tx.claim_flag(&req.claimant_entity, req.claimant_id, &req.flag_field)
        .await?;
    let record = tx.create(&req.record_entity, &req.record_fields).await?;
    tx.increment(
        &req.tally_entity,
        req.tally_id,
        &req.tally_field,
        &Value::Integer(1),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        claimant = %req.claimant_entity,
        claimant_id = req.claimant_id,
        record_id = record.id,
        "Claim recorded"
    );
    Ok(record)
}
