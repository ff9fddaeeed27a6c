//! Page-visit tracking.
//!
//! [`VisitReporter`] turns a page path into a [`VisitEvent`] and submits it
//! with at-most-once, best-effort delivery: failures are logged and dropped,
//! never retried and never returned to navigation. [`PageTracker`] binds the
//! reporter to navigation so each distinct path is reported once.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::backend::{AnalyticsBackend, VisitEvent, PAGE_VISITS_TABLE};
use crate::classify::{classify_device, classify_source, DeviceType, Environment};
use crate::config::RequestConfig;
use crate::error::TrackingError;
use crate::navigation::NavigationListener;
use crate::session::SessionIdentity;

/// Environment signals captured at the moment of navigation.
#[derive(Debug, Clone)]
struct PendingVisit {
    page: String,
    device_type: DeviceType,
    traffic_source: String,
    user_agent: String,
    referrer: String,
    timestamp: DateTime<Utc>,
}

/// Builds visit events and submits them to the backend.
#[derive(Clone)]
pub struct VisitReporter {
    backend: Arc<dyn AnalyticsBackend>,
    identity: SessionIdentity,
    environment: Arc<dyn Environment>,
    timeout: Duration,
}

impl VisitReporter {
    /// Create a reporter
    pub fn new(
        backend: Arc<dyn AnalyticsBackend>,
        identity: SessionIdentity,
        environment: Arc<dyn Environment>,
        request_config: &RequestConfig,
    ) -> Self {
        Self {
            backend,
            identity,
            environment,
            timeout: Duration::from_millis(request_config.timeout_ms),
        }
    }

    fn capture(&self, page: &str) -> PendingVisit {
        let referrer = self.environment.referrer();
        PendingVisit {
            page: page.to_string(),
            device_type: classify_device(self.environment.viewport_width()),
            traffic_source: classify_source(&referrer),
            user_agent: self.environment.user_agent(),
            referrer,
            timestamp: Utc::now(),
        }
    }

    async fn complete(&self, pending: PendingVisit) -> VisitEvent {
        VisitEvent {
            page: pending.page,
            session_id: self.identity.session_id().await,
            device_type: pending.device_type,
            traffic_source: pending.traffic_source,
            user_agent: pending.user_agent,
            referrer: pending.referrer,
            timestamp: pending.timestamp,
            ip_address: None,
        }
    }

    /// Build the event for a visit to `page` from the current environment.
    pub async fn build_event(&self, page: &str) -> VisitEvent {
        let pending = self.capture(page);
        self.complete(pending).await
    }

    async fn submit(&self, event: &VisitEvent) -> Result<(), TrackingError> {
        let row = serde_json::to_value(event)?;
        match tokio::time::timeout(self.timeout, self.backend.insert(PAGE_VISITS_TABLE, row)).await
        {
            Ok(result) => result.map_err(TrackingError::from),
            Err(_) => Err(TrackingError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Build and submit one visit event, returning the delivery outcome.
    pub async fn record_visit(&self, page: &str) -> Result<(), TrackingError> {
        let event = self.build_event(page).await;
        self.submit(&event).await
    }

    /// Report a visit without waiting for delivery.
    ///
    /// Environment signals are read before this returns. Delivery failures
    /// are logged and discarded. Returns `None` when called outside a tokio
    /// runtime, in which case the visit is dropped.
    pub fn report_visit(&self, page: &str) -> Option<JoinHandle<()>> {
        let pending = self.capture(page);
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(page = %page, "No async runtime available, visit not tracked");
                return None;
            }
        };

        let reporter = self.clone();
        Some(handle.spawn(async move {
            let event = reporter.complete(pending).await;
            match reporter.submit(&event).await {
                Ok(()) => debug!(
                    page = %event.page,
                    session_id = %event.session_id,
                    source = %event.traffic_source,
                    "Page visit tracked"
                ),
                Err(e) => error!(page = %event.page, error = %e, "Error tracking page visit"),
            }
        }))
    }
}

/// Reports each distinct navigated path exactly once.
pub struct PageTracker {
    reporter: VisitReporter,
    last_path: Mutex<Option<String>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PageTracker {
    /// Create a tracker reporting through `reporter`
    pub fn new(reporter: VisitReporter) -> Self {
        Self {
            reporter,
            last_path: Mutex::new(None),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Path of the last reported navigation
    pub fn last_path(&self) -> Option<String> {
        lock(&self.last_path).clone()
    }

    /// Wait for every report started so far to finish.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = lock(&self.in_flight).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Visit report task did not complete");
            }
        }
    }
}

impl NavigationListener for PageTracker {
    fn on_navigate(&self, path: &str) {
        {
            let mut last = lock(&self.last_path);
            if last.as_deref() == Some(path) {
                return;
            }
            *last = Some(path.to_string());
        }

        if let Some(handle) = self.reporter.report_visit(path) {
            let mut in_flight = lock(&self.in_flight);
            in_flight.retain(|h| !h.is_finished());
            in_flight.push(handle);
        }
    }
}
