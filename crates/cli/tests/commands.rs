//! Command handlers against a temporary database.

use assert_matches::assert_matches;
use clap::Parser;
use formstore_cli::args::{Cli, Command};
use formstore_cli::catalog::with_users;
use formstore_cli::commands::run;
use formstore_cli::state::AppState;
use formstore_core::error::CoreError;
use formstore_core::schema::{Catalog, EntitySchema, FieldDef};
use formstore_db::{StoreConfig, StoreError};
use serde_json::json;
use tempfile::TempDir;

async fn library() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::new([EntitySchema::new("book")
        .field(FieldDef::text("title").required())
        .field(FieldDef::integer("year"))
        .field(FieldDef::text("note"))])
    .unwrap();
    let config = StoreConfig::at(dir.path().join("library.db"));
    let state = AppState::open(&config, with_users(catalog).unwrap())
        .await
        .unwrap();
    (dir, state)
}

fn command(args: &[&str]) -> Command {
    let argv = std::iter::once("formstore").chain(args.iter().copied());
    Cli::try_parse_from(argv).unwrap().command
}

async fn exec(state: &mut AppState, args: &[&str]) -> anyhow::Result<serde_json::Value> {
    run(state, command(args)).await
}

fn core_error(err: &anyhow::Error) -> Option<&CoreError> {
    err.downcast_ref::<StoreError>()
        .and_then(StoreError::as_core)
        .or_else(|| err.downcast_ref::<CoreError>())
}

#[tokio::test]
async fn create_coerces_and_prints_the_record() {
    let (_dir, mut state) = library().await;

    let out = exec(&mut state, &["create", "book", "--set", "title=Dune", "--set", "year=1965"])
        .await
        .unwrap();

    assert_eq!(out, json!({ "id": 1, "title": "Dune", "year": 1965, "note": null }));
}

#[tokio::test]
async fn update_and_delete_by_field() {
    let (_dir, mut state) = library().await;
    exec(&mut state, &["create", "book", "--set", "title=Dune", "--set", "note=worn"])
        .await
        .unwrap();

    let out = exec(
        &mut state,
        &["update", "book", "--by", "title=Dune", "--set", "year=1965", "--clear", "note"],
    )
    .await
    .unwrap();
    assert_eq!(out, json!({ "id": 1, "title": "Dune", "year": 1965, "note": null }));

    let out = exec(&mut state, &["delete", "book", "--by", "title=Dune"])
        .await
        .unwrap();
    assert_eq!(out, json!({ "deleted": 1 }));
    assert_eq!(exec(&mut state, &["list", "book"]).await.unwrap(), json!([]));
}

#[tokio::test]
async fn ambiguous_name_is_not_mutated() {
    let (_dir, mut state) = library().await;
    for _ in 0..2 {
        exec(&mut state, &["create", "book", "--set", "title=Dune"])
            .await
            .unwrap();
    }

    let err = exec(&mut state, &["delete", "book", "--by", "title=Dune"])
        .await
        .unwrap_err();

    assert_matches!(core_error(&err), Some(CoreError::Conflict(_)));
    assert_eq!(state.store.count("book").await.unwrap(), 2);
}

#[tokio::test]
async fn search_uses_substring_conditions() {
    let (_dir, mut state) = library().await;
    for title in ["Dune", "Dune Messiah", "Emma"] {
        exec(&mut state, &["create", "book", "--set", &format!("title={title}")])
            .await
            .unwrap();
    }

    let out = exec(&mut state, &["search", "book", "--where", "title=Dune"])
        .await
        .unwrap();
    assert_eq!(out.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn get_missing_record_is_not_found() {
    let (_dir, mut state) = library().await;

    let err = exec(&mut state, &["get", "book", "9"]).await.unwrap_err();
    assert_matches!(core_error(&err), Some(CoreError::NotFound { .. }));
}

#[tokio::test]
async fn first_user_bootstraps_then_admin_is_required() {
    let (_dir, mut state) = library().await;

    exec(&mut state, &["register", "root", "--password", "pw", "--role", "admin"])
        .await
        .unwrap();

    let err = exec(&mut state, &["register", "sam", "--password", "pw"])
        .await
        .unwrap_err();
    assert_matches!(core_error(&err), Some(CoreError::Unauthorized(_)));

    exec(&mut state, &["login", "root", "--password", "pw"])
        .await
        .unwrap();
    let out = exec(&mut state, &["register", "sam", "--password", "pw"])
        .await
        .unwrap();
    assert_eq!(out["role"], json!("staff"));
}

#[tokio::test]
async fn staff_cannot_register_users() {
    let (_dir, mut state) = library().await;
    exec(&mut state, &["register", "sam", "--password", "pw"])
        .await
        .unwrap();
    state.login("sam", "pw").await.unwrap();

    let err = exec(&mut state, &["register", "kim", "--password", "pw"])
        .await
        .unwrap_err();
    assert_matches!(core_error(&err), Some(CoreError::Forbidden(_)));
}

#[tokio::test]
async fn user_records_are_not_written_directly() {
    let (_dir, mut state) = library().await;

    let err = exec(
        &mut state,
        &["create", "user", "--set", "username=x", "--set", "password_hash=plain", "--set", "role=admin"],
    )
    .await
    .unwrap_err();
    assert_matches!(core_error(&err), Some(CoreError::Validation(_)));
}

#[tokio::test]
async fn init_reports_every_entity() {
    let (_dir, mut state) = library().await;

    let out = exec(&mut state, &["init"]).await.unwrap();
    assert_eq!(
        out,
        json!({ "entities": [
            { "entity": "book", "records": 0 },
            { "entity": "user", "records": 0 },
        ]})
    );
}

#[tokio::test]
async fn deleting_users_requires_admin() {
    let (_dir, mut state) = library().await;
    exec(&mut state, &["register", "root", "--password", "pw", "--role", "admin"])
        .await
        .unwrap();

    let err = exec(&mut state, &["delete", "user", "1"]).await.unwrap_err();
    assert_matches!(core_error(&err), Some(CoreError::Unauthorized(_)));

    state.login("root", "pw").await.unwrap();
    exec(&mut state, &["register", "sam", "--password", "pw"])
        .await
        .unwrap();
    state.login("sam", "pw").await.unwrap();
    let err = exec(&mut state, &["delete", "user", "--by", "username=root"])
        .await
        .unwrap_err();
    assert_matches!(core_error(&err), Some(CoreError::Forbidden(_)));
    assert_eq!(state.store.count("user").await.unwrap(), 2);

    state.login("root", "pw").await.unwrap();
    exec(&mut state, &["delete", "user", "--by", "username=sam"])
        .await
        .unwrap();
    assert_eq!(state.store.count("user").await.unwrap(), 1);
}

#[tokio::test]
async fn keyword_search_spans_fields() {
    let (_dir, mut state) = library().await;
    for (title, note) in [("Dune", "classic"), ("Emma", "Dune-like pacing"), ("Persuasion", "")] {
        exec(
            &mut state,
            &["create", "book", "--set", &format!("title={title}"), "--set", &format!("note={note}")],
        )
        .await
        .unwrap();
    }

    let out = exec(
        &mut state,
        &["search", "book", "--keyword", "Dune", "--in", "title", "--in", "note"],
    )
    .await
    .unwrap();
    let titles: Vec<_> = out
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Dune", "Emma"]);
}
