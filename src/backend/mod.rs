//! Hosted analytics backend.
//!
//! The backend stores raw visit events and owns the pre-computed aggregate
//! tables read by the dashboard. It also issues admin sessions.
//! [`RestBackend`] talks to the hosted service over HTTP and
//! [`MemoryBackend`] is an in-process stand-in.

mod memory;
mod rest;
mod types;

pub use memory::{MemoryBackend, INVALID_CREDENTIALS};
pub use rest::{RestBackend, ADMIN_SESSION_KEY};
pub use types::*;

use async_trait::async_trait;

use crate::error::BackendResult;

/// Table receiving raw visit events.
pub const PAGE_VISITS_TABLE: &str = "page_visits";
/// Daily rollup, keyed by `date`.
pub const DAILY_TABLE: &str = "analytics_daily";
/// Weekly rollup, keyed by `week_start`.
pub const WEEKLY_TABLE: &str = "analytics_weekly";
/// Monthly rollup, keyed by `month_start`.
pub const MONTHLY_TABLE: &str = "analytics_monthly";
/// Visits per page.
pub const PAGES_TABLE: &str = "analytics_pages";
/// Visits per traffic source.
pub const SOURCES_TABLE: &str = "analytics_sources";
/// Visits per device class.
pub const DEVICES_TABLE: &str = "analytics_devices";

/// Read/write and auth contract of the hosted analytics backend.
#[async_trait]
pub trait AnalyticsBackend: Send + Sync {
    /// Insert one row into `table`.
    async fn insert(&self, table: &str, row: serde_json::Value) -> BackendResult<()>;

    /// Read rows as described by `query`.
    async fn select(&self, query: &SelectQuery) -> BackendResult<Vec<serde_json::Value>>;

    /// Active admin session, if any.
    async fn get_session(&self) -> BackendResult<Option<AdminSession>>;

    /// Verify credentials and open an admin session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AdminSession>;

    /// End the active admin session.
    async fn sign_out(&self) -> BackendResult<()>;
}
