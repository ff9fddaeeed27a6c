//! # Grill Analytics
//!
//! Page-visit tracking and admin dashboard client for a small restaurant
//! website. Visits are written to a hosted backend that owns the daily,
//! weekly, monthly, page, source and device rollups; the dashboard reads
//! those rollups back.
//!
//! ## Architecture
//!
//! ```text
//! navigate(path) → PageTracker → VisitReporter → AnalyticsBackend.insert
//!                                   ↓
//!                      SessionIdentity (KeyValueStore) + classify
//!
//! AuthGate.check → Dashboard.load → 6 × AnalyticsBackend.select (concurrent)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use grill_analytics::{AppState, Config};
//! use grill_analytics::backend::RestBackend;
//! use grill_analytics::classify::StaticEnvironment;
//! use grill_analytics::storage::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(SqliteStore::new(&config.storage).await?);
//!     let backend = Arc::new(RestBackend::new(&config.backend, config.request.clone())?);
//!     let state = AppState::new(config, backend, store, Arc::new(StaticEnvironment::default()));
//!     state.navigate("/meny");
//!     state.flush().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Admin authentication gate.
pub mod auth;
/// Hosted analytics backend contract and clients.
pub mod backend;
/// Device and traffic-source classification.
pub mod classify;
/// Configuration management.
pub mod config;
/// Dashboard data loading and derived metrics.
pub mod dashboard;
/// Error types and result aliases.
pub mod error;
/// Site routes and navigation events.
pub mod navigation;
/// Per-browser session identity.
pub mod session;
/// Application wiring.
pub mod state;
/// Durable client-side key-value storage.
pub mod storage;
/// Page-visit reporting and tracking.
pub mod tracking;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::{AppState, SharedState};
