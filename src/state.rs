//! Application wiring shared by the binary and integration tests.

use std::sync::{Arc, Mutex};

use crate::auth::AuthGate;
use crate::backend::AnalyticsBackend;
use crate::classify::Environment;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::navigation::{Navigator, Route};
use crate::session::SessionIdentity;
use crate::storage::KeyValueStore;
use crate::tracking::{PageTracker, VisitReporter};

/// Application state: tracking pipeline, auth gate and dashboard.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Hosted analytics backend.
    pub backend: Arc<dyn AnalyticsBackend>,
    /// Session identity over durable storage.
    pub identity: SessionIdentity,
    /// Visit reporter.
    pub reporter: VisitReporter,
    /// Navigation-bound page tracker.
    pub tracker: Arc<PageTracker>,
    /// Admin authentication gate.
    pub gate: AuthGate,
    /// Dashboard data loader.
    pub dashboard: Dashboard,
    navigator: Mutex<Navigator>,
}

/// Shared handle to [`AppState`]
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire every component together
    pub fn new(
        config: Config,
        backend: Arc<dyn AnalyticsBackend>,
        store: Arc<dyn KeyValueStore>,
        environment: Arc<dyn Environment>,
    ) -> Self {
        let identity = SessionIdentity::new(store);
        let reporter = VisitReporter::new(
            backend.clone(),
            identity.clone(),
            environment,
            &config.request,
        );
        let tracker = Arc::new(PageTracker::new(reporter.clone()));
        let gate = AuthGate::new(backend.clone(), &config.request);
        let dashboard = Dashboard::new(
            backend.clone(),
            gate.clone(),
            config.dashboard.clone(),
            &config.request,
        );

        let mut navigator = Navigator::new();
        navigator.subscribe(tracker.clone());

        Self {
            config,
            backend,
            identity,
            reporter,
            tracker,
            gate,
            dashboard,
            navigator: Mutex::new(navigator),
        }
    }

    /// Navigate to `location`, reporting the visit in the background.
    pub fn navigate(&self, location: &str) -> Route {
        self.navigator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .navigate(location)
    }

    /// Wait for in-flight visit reports.
    pub async fn flush(&self) {
        self.tracker.flush().await;
    }
}
