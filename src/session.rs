//! Per-browser session identity.
//!
//! The identifier is created once per storage lifetime and read back on
//! every visit. Storage failures never block tracking: a fresh, unpersisted
//! identifier is handed out instead.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::KeyValueStore;

/// Storage key holding the session identifier.
pub const SESSION_KEY: &str = "analytics_session_id";

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque session identifier, `session_<epoch-ms>_<base36>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new identifier from the current time and a random suffix.
    pub fn generate() -> Self {
        Self(format!(
            "session_{}_{}",
            Utc::now().timestamp_millis(),
            random_suffix()
        ))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

fn random_suffix() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        out.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    out
}

/// Reads or creates the session identifier in durable storage.
#[derive(Clone)]
pub struct SessionIdentity {
    store: Arc<dyn KeyValueStore>,
    create_lock: Arc<Mutex<()>>,
}

impl SessionIdentity {
    /// Create a session identity backed by the given store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Return the persisted identifier, creating and persisting one on first use.
    pub async fn session_id(&self) -> SessionId {
        // Serialize get-or-create so concurrent first visits agree on one id.
        let _guard = self.create_lock.lock().await;

        match self.store.get(SESSION_KEY).await {
            Ok(Some(existing)) if !existing.is_empty() => return SessionId(existing),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Session storage unavailable, using unpersisted session id");
                return SessionId::generate();
            }
        }

        let id = SessionId::generate();
        match self.store.set(SESSION_KEY, id.as_str()).await {
            Ok(()) => debug!(session_id = %id, "Created new session id"),
            Err(e) => warn!(error = %e, "Failed to persist session id"),
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{MemoryStore, MockKeyValueStore};

    fn assert_well_formed(id: &SessionId) {
        let parts: Vec<&str> = id.as_str().splitn(3, '_').collect();
        assert_eq!(parts.len(), 3, "unexpected id: {}", id);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generate_format() {
        let id = SessionId::generate();
        assert_well_formed(&id);
        assert_ne!(id, SessionId::generate());
    }

    #[tokio::test]
    async fn test_session_id_is_stable() {
        let store = Arc::new(MemoryStore::new());
        let identity = SessionIdentity::new(store.clone());

        let first = identity.session_id().await;
        let second = identity.session_id().await;
        assert_eq!(first, second);
        assert_eq!(
            store.get(SESSION_KEY).await.unwrap().as_deref(),
            Some(first.as_str())
        );
    }

    #[tokio::test]
    async fn test_session_id_changes_after_storage_cleared() {
        let store = Arc::new(MemoryStore::new());
        let identity = SessionIdentity::new(store.clone());

        let before = identity.session_id().await;
        store.clear().await;
        let after = identity.session_id().await;

        assert_ne!(before, after);
        assert_eq!(after, identity.session_id().await);
    }

    #[tokio::test]
    async fn test_existing_value_is_returned_unchanged() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_KEY, "session_1_abc").await.unwrap();

        let identity = SessionIdentity::new(store);
        assert_eq!(identity.session_id().await.as_str(), "session_1_abc");
    }

    #[tokio::test]
    async fn test_unreadable_storage_yields_fresh_id() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| {
            Err(StorageError::Connection {
                message: "storage disabled".to_string(),
            })
        });
        store.expect_set().never();

        let identity = SessionIdentity::new(Arc::new(store));
        let id = identity.session_id().await;
        assert_well_formed(&id);
    }

    #[tokio::test]
    async fn test_unwritable_storage_still_returns_id() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_set().times(2).returning(|_, _| {
            Err(StorageError::Query {
                message: "quota exceeded".to_string(),
            })
        });

        let identity = SessionIdentity::new(Arc::new(store));
        let first = identity.session_id().await;
        let second = identity.session_id().await;
        assert_well_formed(&first);
        assert_ne!(first, second);
    }
}
