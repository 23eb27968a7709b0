#![allow(dead_code)]

use formstore_core::schema::{Catalog, EntitySchema, FieldDef};
use formstore_core::status::StatusMachine;
use formstore_db::{EntityStore, StoreConfig};
use tempfile::TempDir;

/// Open a store on a fresh database file. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn open_store(catalog: Catalog) -> (TempDir, EntityStore) {
    open_store_with(catalog, |_| {}).await
}

pub async fn open_store_with(
    catalog: Catalog,
    tweak: impl FnOnce(&mut StoreConfig),
) -> (TempDir, EntityStore) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoreConfig::at(dir.path().join("forms.db"));
    tweak(&mut config);
    let store = EntityStore::open(&config, catalog).await.unwrap();
    (dir, store)
}

pub fn task_status() -> StatusMachine {
    StatusMachine::new("Pending")
        .allow("Pending", &["Completed", "Cancelled"])
        .allow("Completed", &[])
}

/// Students, their attendance, and a task list.
pub fn school_catalog() -> Catalog {
    Catalog::new([
        EntitySchema::new("student")
            .field(FieldDef::text("name").required())
            .field(FieldDef::integer("roll_number"))
            .field(FieldDef::text("email"))
            .field(FieldDef::real("gpa")),
        EntitySchema::new("attendance")
            .field(FieldDef::reference("student_id", "student").required())
            .field(FieldDef::date("date").required())
            .field(FieldDef::status(
                "status",
                StatusMachine::new("Absent")
                    .allow("Absent", &["Present"])
                    .allow("Present", &["Absent"]),
            ))
            .field(FieldDef::text("note")),
        EntitySchema::new("task")
            .field(FieldDef::text("title").required())
            .field(FieldDef::status("state", task_status()).required())
            .field(FieldDef::date("due")),
    ])
    .unwrap()
}

/// Products and the order lines that consume their stock.
pub fn shop_catalog() -> Catalog {
    Catalog::new([
        EntitySchema::new("product")
            .field(FieldDef::text("name").required())
            .field(FieldDef::real("price").required())
            .field(FieldDef::integer("stock").required()),
        EntitySchema::new("order_item")
            .field(FieldDef::reference("product_id", "product").required())
            .field(FieldDef::integer("quantity").required()),
    ])
    .unwrap()
}

/// Voters, candidates and cast votes.
pub fn ballot_catalog() -> Catalog {
    Catalog::new([
        EntitySchema::new("voter")
            .field(FieldDef::text("name").required())
            .field(FieldDef::integer("has_voted")),
        EntitySchema::new("candidate")
            .field(FieldDef::text("name").required())
            .field(FieldDef::integer("vote_count")),
        EntitySchema::new("vote")
            .field(FieldDef::reference("voter_id", "voter").required())
            .field(FieldDef::reference("candidate_id", "candidate").required()),
    ])
    .unwrap()
}
