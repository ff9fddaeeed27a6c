//! SQLite key-value storage tests
//!
//! Verifies persistence across reopen and the session identity built on top.

use std::sync::Arc;

use tempfile::tempdir;

use grill_analytics::config::StorageConfig;
use grill_analytics::session::{SessionIdentity, SESSION_KEY};
use grill_analytics::storage::{KeyValueStore, SqliteStore};

fn storage_config(path: std::path::PathBuf) -> StorageConfig {
    StorageConfig {
        path,
        max_connections: 1,
    }
}

#[tokio::test]
async fn test_set_get_remove() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = SqliteStore::new(&storage_config(dir.path().join("client.db")))
        .await
        .expect("Failed to open store");

    assert!(store.get("missing").await.unwrap().is_none());

    store.set("k", "one").await.unwrap();
    store.set("k", "two").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));

    store.remove("k").await.unwrap();
    assert!(store.get("k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_creates_missing_parent_directory() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("data").join("client.db");

    let store = SqliteStore::new(&storage_config(path.clone())).await.unwrap();
    store.set("k", "v").await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_session_id_survives_reopen() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = storage_config(dir.path().join("client.db"));

    let first_id = {
        let store = Arc::new(SqliteStore::new(&config).await.unwrap());
        SessionIdentity::new(store).session_id().await
    };

    let store = Arc::new(SqliteStore::new(&config).await.unwrap());
    assert_eq!(
        store.get(SESSION_KEY).await.unwrap().as_deref(),
        Some(first_id.as_str())
    );
    let identity = SessionIdentity::new(store.clone());
    assert_eq!(identity.session_id().await, first_id);

    store.clear().await.unwrap();
    assert_ne!(identity.session_id().await, first_id);
}
