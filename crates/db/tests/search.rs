//! Integration tests for predicate search.

mod common;

use assert_matches::assert_matches;
use formstore_core::error::CoreError;
use formstore_core::schema::{Catalog, EntitySchema, FieldDef};
use formstore_core::value::{field_values, FieldValues, Value};
use formstore_db::{EntityStore, StoreError};
use tempfile::TempDir;

use common::open_store;

fn donor_catalog() -> Catalog {
    Catalog::new([EntitySchema::new("donor")
        .field(FieldDef::text("name").required())
        .field(FieldDef::text("blood_type").required().exact())
        .field(FieldDef::integer("age"))
        .field(FieldDef::date("last_donation"))])
    .unwrap()
}

async fn seeded() -> (TempDir, EntityStore) {
    let (dir, store) = open_store(donor_catalog()).await;
    for (name, blood, age, last) in [
        ("Alice Smith", "O+", Some(34_i64), Some("2023-10-01")),
        ("alice jones", "A-", Some(51), None),
        ("Malik", "O+", None, Some("2024-01-15")),
        ("Bob Alison", "O-", Some(34), None),
    ] {
        store
            .create(
                "donor",
                &field_values([
                    ("name", Value::from(name)),
                    ("blood_type", blood.into()),
                    ("age", age.into()),
                    ("last_donation", last.into()),
                ]),
            )
            .await
            .unwrap();
    }
    (dir, store)
}

async fn names(store: &EntityStore, predicates: FieldValues) -> Vec<String> {
    store
        .search("donor", &predicates)
        .await
        .unwrap()
        .iter()
        .map(|r| r.text("name").unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn empty_predicate_returns_everything() {
    let (_dir, store) = seeded().await;

    let all = store.search("donor", &FieldValues::new()).await.unwrap();
    assert_eq!(all, store.read_all("donor").await.unwrap());
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn text_matches_by_case_sensitive_substring() {
    let (_dir, store) = seeded().await;

    assert_eq!(
        names(&store, field_values([("name", "Ali")])).await,
        vec!["Alice Smith", "Bob Alison"]
    );
    assert_eq!(
        names(&store, field_values([("name", "ali")])).await,
        vec!["alice jones", "Malik"]
    );
    assert!(names(&store, field_values([("name", "ALI")])).await.is_empty());
}

#[tokio::test]
async fn exact_fields_do_not_match_substrings() {
    let (_dir, store) = seeded().await;

    assert_eq!(
        names(&store, field_values([("blood_type", "O+")])).await,
        vec!["Alice Smith", "Malik"]
    );
    assert!(names(&store, field_values([("blood_type", "O")])).await.is_empty());
    assert_eq!(
        names(&store, field_values([("last_donation", "2024-01-15")])).await,
        vec!["Malik"]
    );
}

#[tokio::test]
async fn predicates_are_combined_with_and() {
    let (_dir, store) = seeded().await;

    assert_eq!(
        names(
            &store,
            field_values([("age", Value::Integer(34)), ("blood_type", "O-".into())])
        )
        .await,
        vec!["Bob Alison"]
    );
}

#[tokio::test]
async fn numeric_text_and_null_predicates() {
    let (_dir, store) = seeded().await;

    assert_eq!(
        names(&store, field_values([("age", "51")])).await,
        vec!["alice jones"]
    );
    assert_eq!(
        names(&store, field_values([("age", Value::Null)])).await,
        vec!["Malik"]
    );
}

#[tokio::test]
async fn id_predicate_matches_one_record() {
    let (_dir, store) = seeded().await;
    let third = store.read_all("donor").await.unwrap().remove(2);

    let hits = store
        .search("donor", &field_values([("id", Value::Integer(third.id))]))
        .await
        .unwrap();
    assert_eq!(hits, vec![third]);
}

#[tokio::test]
async fn unknown_predicate_field_is_rejected() {
    let (_dir, store) = seeded().await;

    let err = store
        .search("donor", &field_values([("weight", "80")]))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));
}

async fn keyword_names(store: &EntityStore, fields: &[&str], keyword: &str) -> Vec<String> {
    let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    store
        .search_any("donor", &fields, keyword)
        .await
        .unwrap()
        .iter()
        .map(|r| r.text("name").unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn keyword_matches_any_listed_field() {
    let (_dir, store) = seeded().await;

    assert_eq!(
        keyword_names(&store, &["name", "blood_type"], "O+").await,
        vec!["Alice Smith", "Malik"]
    );
    assert_eq!(
        keyword_names(&store, &["name", "age"], "34").await,
        vec!["Alice Smith", "Bob Alison"]
    );
    assert_eq!(
        keyword_names(&store, &["name", "age"], "ali").await,
        vec!["alice jones", "Malik"]
    );
    assert!(keyword_names(&store, &["age"], "Ali").await.is_empty());
}

#[tokio::test]
async fn keyword_search_rejects_blank_keyword_and_unknown_fields() {
    let (_dir, store) = seeded().await;

    let err = store
        .search_any("donor", &["name".to_string()], "  ")
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));

    let err = store
        .search_any("donor", &["weight".to_string()], "80")
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));
}
