//! One handler per subcommand. Every handler returns the JSON printed on
//! stdout.

use formstore_core::error::CoreError;
use formstore_core::roles::ROLE_ADMIN;
use formstore_core::types::DbId;
use formstore_core::value::{FieldValues, Record, Value};
use formstore_db::auth::{self, USER_ENTITY};
use formstore_db::StoreTx;
use serde_json::json;

use crate::args::{Command, Target};
use crate::state::AppState;

pub async fn run(state: &mut AppState, command: Command) -> anyhow::Result<serde_json::Value> {
    let output = match command {
        Command::Init => init(state).await?,
        Command::Entities => {
            let schemas: Vec<_> = state.store.catalog().iter().collect();
            serde_json::to_value(schemas)?
        }
        Command::Create { entity, fields } => {
            reject_user_writes(&entity)?;
            let record = state.store.create(&entity, &fields.to_values()).await?;
            tracing::info!(entity = %entity, id = record.id, "Record created");
            serde_json::to_value(record)?
        }
        Command::List { entity } => serde_json::to_value(state.store.read_all(&entity).await?)?,
        Command::Get { entity, target } => {
            let record = match &target.by {
                Some((field, value)) => {
                    state
                        .store
                        .find_one_by(&entity, field, &Value::Text(value.clone()))
                        .await?
                }
                None => state.store.read_by_id(&entity, required_id(&target)?).await?,
            };
            serde_json::to_value(record)?
        }
        Command::Search {
            entity,
            conditions,
            keyword: Some(keyword),
            fields,
        } if conditions.is_empty() => {
            serde_json::to_value(state.store.search_any(&entity, &fields, &keyword).await?)?
        }
        Command::Search {
            entity, conditions, ..
        } => {
            let predicates: FieldValues = conditions
                .into_iter()
                .map(|(field, value)| (field, Value::Text(value)))
                .collect();
            serde_json::to_value(state.store.search(&entity, &predicates).await?)?
        }
        Command::Update {
            entity,
            target,
            fields,
        } => {
            reject_user_writes(&entity)?;
            let mut tx = state.store.begin().await?;
            let id = resolve_id(&mut tx, &entity, &target).await?;
            let record = tx.update(&entity, id, &fields.to_values()).await?;
            tx.commit().await?;
            tracing::info!(entity = %entity, id, "Record updated");
            serde_json::to_value(record)?
        }
        Command::Delete { entity, target } => {
            if entity == USER_ENTITY {
                state.require_role(ROLE_ADMIN)?;
            }
            let mut tx = state.store.begin().await?;
            let id = resolve_id(&mut tx, &entity, &target).await?;
            tx.delete(&entity, id).await?;
            tx.commit().await?;
            tracing::info!(entity = %entity, id, "Record deleted");
            json!({ "deleted": id })
        }
        Command::Register {
            username,
            password,
            role,
        } => register(state, &username, &password, &role).await?,
        Command::Login { username, password } => {
            serde_json::to_value(state.login(&username, &password).await?)?
        }
    };
    Ok(output)
}

async fn init(state: &AppState) -> anyhow::Result<serde_json::Value> {
    let mut entities = Vec::new();
    for schema in state.store.catalog().iter() {
        let records = state.store.count(&schema.name).await?;
        entities.push(json!({ "entity": schema.name, "records": records }));
    }
    Ok(json!({ "entities": entities }))
}

/// The first account may be created by anyone; after that only an admin
/// can add users.
async fn register(
    state: &AppState,
    username: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<serde_json::Value> {
    if state.store.count(USER_ENTITY).await? > 0 {
        state.require_role(ROLE_ADMIN)?;
    }
    let user = auth::register(&state.store, username, password, role).await?;
    Ok(serde_json::to_value(user)?)
}

/// Passwords must go through `register` so they are stored hashed.
/// Deleting users is allowed, but only for an admin.
fn reject_user_writes(entity: &str) -> Result<(), CoreError> {
    if entity == USER_ENTITY {
        return Err(CoreError::Validation(format!(
            "Use the register command to create or change {USER_ENTITY} records"
        )));
    }
    Ok(())
}

fn required_id(target: &Target) -> Result<DbId, CoreError> {
    target
        .id
        .ok_or_else(|| CoreError::Validation("A record id or --by FIELD=VALUE is required".into()))
}

async fn resolve_id(tx: &mut StoreTx, entity: &str, target: &Target) -> anyhow::Result<DbId> {
    match &target.by {
        Some((field, value)) => {
            let record: Record = tx
                .find_one_by(entity, field, &Value::Text(value.clone()))
                .await?;
            Ok(record.id)
        }
        None => Ok(required_id(target)?),
    }
}
