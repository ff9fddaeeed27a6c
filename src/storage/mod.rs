//! Durable client-side key-value storage.
//!
//! The session identifier lives here. [`KeyValueStore`] is the port the rest
//! of the crate depends on; [`SqliteStore`] persists to disk and
//! [`MemoryStore`] keeps values for the lifetime of the process.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StorageResult;

/// String key-value storage with `get`/`set` capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Remove `key` if present.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
