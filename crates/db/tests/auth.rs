//! Integration tests for the `user` entity and login.

mod common;

use assert_matches::assert_matches;
use formstore_core::error::CoreError;
use formstore_core::hashing::hash_password;
use formstore_core::roles::{ROLE_ADMIN, ROLE_STAFF};
use formstore_core::schema::Catalog;
use formstore_db::auth::{login, register, user_schema, USER_ENTITY};
use formstore_db::StoreError;

use common::{open_store, school_catalog};

fn catalog() -> Catalog {
    school_catalog().with(user_schema()).unwrap()
}

#[tokio::test]
async fn register_then_login() {
    let (_dir, store) = open_store(catalog()).await;

    let registered = register(&store, "dana", "s3cret", ROLE_ADMIN).await.unwrap();
    let logged_in = login(&store, "dana", "s3cret").await.unwrap();

    assert_eq!(logged_in, registered);
    assert!(logged_in.has_role(ROLE_ADMIN));
    assert!(logged_in.require_role(ROLE_ADMIN).is_ok());
}

#[tokio::test]
async fn password_is_stored_hashed() {
    let (_dir, store) = open_store(catalog()).await;
    let user = register(&store, "dana", "s3cret", ROLE_STAFF).await.unwrap();

    let record = store.read_by_id(USER_ENTITY, user.id).await.unwrap();
    assert_eq!(record.text("password_hash"), Some(hash_password("s3cret").as_str()));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_unauthorized() {
    let (_dir, store) = open_store(catalog()).await;
    register(&store, "dana", "s3cret", ROLE_STAFF).await.unwrap();

    assert_matches!(
        login(&store, "dana", "S3cret").await.unwrap_err(),
        StoreError::Core(CoreError::Unauthorized(_))
    );
    assert_matches!(
        login(&store, "dan", "s3cret").await.unwrap_err(),
        StoreError::Core(CoreError::Unauthorized(_))
    );
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let (_dir, store) = open_store(catalog()).await;
    register(&store, "dana", "one", ROLE_STAFF).await.unwrap();

    let err = register(&store, "dana", "two", ROLE_ADMIN).await.unwrap_err();

    assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
    assert_eq!(store.count(USER_ENTITY).await.unwrap(), 1);
}

#[tokio::test]
async fn blank_credentials_are_rejected() {
    let (_dir, store) = open_store(catalog()).await;

    assert_matches!(
        register(&store, " ", "pw", ROLE_STAFF).await.unwrap_err(),
        StoreError::Core(CoreError::Validation(_))
    );
    assert_matches!(
        register(&store, "erin", "", ROLE_STAFF).await.unwrap_err(),
        StoreError::Core(CoreError::Validation(_))
    );
    assert_matches!(
        register(&store, "erin", "pw", "").await.unwrap_err(),
        StoreError::Core(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn staff_cannot_pass_admin_check() {
    let (_dir, store) = open_store(catalog()).await;
    let staff = register(&store, "sam", "pw", ROLE_STAFF).await.unwrap();

    assert_matches!(
        staff.require_role(ROLE_ADMIN).unwrap_err(),
        CoreError::Forbidden(_)
    );
}

#[tokio::test]
async fn login_requires_user_entity_in_catalog() {
    let (_dir, store) = open_store(school_catalog()).await;

    assert_matches!(
        login(&store, "dana", "pw").await.unwrap_err(),
        StoreError::Core(CoreError::Validation(_))
    );
}
