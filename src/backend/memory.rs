use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{AdminSession, AnalyticsBackend, SelectQuery};
use crate::error::{BackendError, BackendResult};

/// Message returned for a failed password sign-in.
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";

/// In-process backend holding tables, users and one admin session.
///
/// Tables can be marked as failing and calls can be delayed, which makes it
/// suitable for exercising failure containment and timeouts.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    users: RwLock<HashMap<String, String>>,
    session: RwLock<Option<AdminSession>>,
    failing_tables: RwLock<HashSet<String>>,
    latency: RwLock<Option<Duration>>,
    insert_calls: AtomicUsize,
    select_calls: AtomicUsize,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an admin user
    pub fn with_user(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.get_mut().insert(email.into(), password.into());
        self
    }

    /// Seed `table` with rows
    pub fn with_rows(mut self, table: impl Into<String>, rows: Vec<Value>) -> Self {
        self.tables
            .get_mut()
            .entry(table.into())
            .or_default()
            .extend(rows);
        self
    }

    /// Make every call touching `table` fail
    pub async fn fail_table(&self, table: impl Into<String>) {
        self.failing_tables.write().await.insert(table.into());
    }

    /// Delay every insert and select by `latency`
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Replace the active session, e.g. with an already expired one
    pub async fn set_session(&self, session: Option<AdminSession>) {
        *self.session.write().await = session;
    }

    /// Rows currently stored in `table`
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of insert calls received, failed ones included
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of select calls received, failed ones included
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(AtomicOrdering::SeqCst)
    }

    async fn simulate(&self, table: &str) -> BackendResult<()> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing_tables.read().await.contains(table) {
            return Err(BackendError::Api {
                status: 503,
                message: format!("{} is unavailable", table),
            });
        }
        Ok(())
    }
}

/// Descending order on a JSON column; numbers numerically, everything else as text.
fn compare_desc(a: &Value, b: &Value, column: &str) -> Ordering {
    let (a, b) = (a.get(column), b.get(column));
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        _ => {
            let text = |v: Option<&Value>| match v {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            text(b).cmp(&text(a))
        }
    }
}

#[async_trait]
impl AnalyticsBackend for MemoryBackend {
    async fn insert(&self, table: &str, row: Value) -> BackendResult<()> {
        self.insert_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.simulate(table).await?;

        if !row.is_object() {
            return Err(BackendError::Api {
                status: 400,
                message: "row must be a JSON object".to_string(),
            });
        }

        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(row);
        debug!(table = %table, "Row inserted");
        Ok(())
    }

    async fn select(&self, query: &SelectQuery) -> BackendResult<Vec<Value>> {
        self.select_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.simulate(&query.table).await?;

        let mut rows = self.rows(&query.table).await;
        if let Some(column) = &query.order_desc {
            rows.sort_by(|a, b| compare_desc(a, b, column));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn get_session(&self) -> BackendResult<Option<AdminSession>> {
        let mut session = self.session.write().await;
        if session.as_ref().is_some_and(AdminSession::is_expired) {
            *session = None;
        }
        Ok(session.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AdminSession> {
        let valid = self
            .users
            .read()
            .await
            .get(email)
            .is_some_and(|expected| expected == password);

        if !valid {
            return Err(BackendError::Api {
                status: 400,
                message: INVALID_CREDENTIALS.to_string(),
            });
        }

        let session = AdminSession::new(Uuid::new_v4().to_string()).with_email(email);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        *self.session.write().await = None;
        Ok(())
    }
}
