//! Admin dashboard data.
//!
//! Six aggregate tables are read concurrently once the [`AuthGate`] reports
//! an authenticated session. A branch that fails or times out contributes an
//! empty list and is listed in [`DashboardData::failed`]; the other branches
//! still render.

use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::auth::AuthGate;
use crate::backend::{
    AnalyticsBackend, DailyVisitAggregate, DeviceAggregate, MonthlyVisitAggregate, PageAggregate,
    SelectQuery, SourceAggregate, WeeklyVisitAggregate, DAILY_TABLE, DEVICES_TABLE,
    MONTHLY_TABLE, PAGES_TABLE, SOURCES_TABLE, WEEKLY_TABLE,
};
use crate::config::{DashboardConfig, RequestConfig};
use crate::error::{BackendError, BackendResult, DashboardError};

/// Points shown in the daily visitors chart.
pub const DAILY_CHART_POINTS: usize = 30;
/// Bars shown in the weekly chart.
pub const WEEKLY_CHART_POINTS: usize = 8;
/// Bars shown in the monthly chart.
pub const MONTHLY_CHART_POINTS: usize = 6;
/// Label used when no page has been visited yet.
pub const DEFAULT_TOP_PAGE: &str = "Hem";

/// The six aggregates read by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    /// Visitors per day.
    Daily,
    /// Visitors per week.
    Weekly,
    /// Visitors per month.
    Monthly,
    /// Visits per page.
    Pages,
    /// Visits per traffic source.
    Sources,
    /// Visits per device class.
    Devices,
}

impl AggregateKind {
    /// Backend table holding this aggregate
    pub fn table(&self) -> &'static str {
        match self {
            AggregateKind::Daily => DAILY_TABLE,
            AggregateKind::Weekly => WEEKLY_TABLE,
            AggregateKind::Monthly => MONTHLY_TABLE,
            AggregateKind::Pages => PAGES_TABLE,
            AggregateKind::Sources => SOURCES_TABLE,
            AggregateKind::Devices => DEVICES_TABLE,
        }
    }
}

impl std::fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// Percentage of `visits` in `total`; 0 when `total` is 0.
pub fn percent_of(visits: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        visits as f64 / total as f64 * 100.0
    }
}

/// Format a percentage with one decimal, e.g. `12.5%`.
pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

/// A source or device row with its share of total visitors.
#[derive(Debug, Clone, PartialEq)]
pub struct Share {
    /// Source or device name.
    pub label: String,
    /// Visits in this bucket.
    pub visits: u64,
    /// Share of total visitors, 0 to 100.
    pub percent: f64,
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    /// Newest first.
    pub daily: Vec<DailyVisitAggregate>,
    /// Newest first.
    pub weekly: Vec<WeeklyVisitAggregate>,
    /// Newest first.
    pub monthly: Vec<MonthlyVisitAggregate>,
    /// Most visited first.
    pub pages: Vec<PageAggregate>,
    /// Visits per traffic source.
    pub sources: Vec<SourceAggregate>,
    /// Visits per device class.
    pub devices: Vec<DeviceAggregate>,
    /// Aggregates that could not be read.
    pub failed: Vec<AggregateKind>,
}

impl DashboardData {
    /// Sum of unique visitors over the returned daily rows
    pub fn total_visitors(&self) -> u64 {
        self.daily.iter().map(|d| d.unique_visitors).sum()
    }

    /// Unique visitors of the newest day
    pub fn today_visitors(&self) -> u64 {
        self.daily.first().map_or(0, |d| d.unique_visitors)
    }

    /// Page views of the newest day
    pub fn today_page_views(&self) -> u64 {
        self.daily.first().map_or(0, |d| d.page_views)
    }

    /// Most visited page and its visit count
    pub fn top_page(&self) -> (&str, u64) {
        self.pages
            .first()
            .map_or((DEFAULT_TOP_PAGE, 0), |p| (p.page.as_str(), p.visits))
    }

    /// Share of total visitors for `visits`
    pub fn share(&self, visits: u64) -> f64 {
        percent_of(visits, self.total_visitors())
    }

    /// Traffic sources with their share of total visitors
    pub fn source_shares(&self) -> Vec<Share> {
        let total = self.total_visitors();
        self.sources
            .iter()
            .map(|s| Share {
                label: s.source.clone(),
                visits: s.visits,
                percent: percent_of(s.visits, total),
            })
            .collect()
    }

    /// Device classes with their share of total visitors
    pub fn device_shares(&self) -> Vec<Share> {
        let total = self.total_visitors();
        self.devices
            .iter()
            .map(|d| Share {
                label: d.device.clone(),
                visits: d.visits,
                percent: percent_of(d.visits, total),
            })
            .collect()
    }

    /// Daily chart points, oldest first
    pub fn daily_series(&self) -> Vec<&DailyVisitAggregate> {
        chronological(&self.daily, DAILY_CHART_POINTS)
    }

    /// Weekly chart bars, oldest first
    pub fn weekly_series(&self) -> Vec<&WeeklyVisitAggregate> {
        chronological(&self.weekly, WEEKLY_CHART_POINTS)
    }

    /// Monthly chart bars, oldest first
    pub fn monthly_series(&self) -> Vec<&MonthlyVisitAggregate> {
        chronological(&self.monthly, MONTHLY_CHART_POINTS)
    }

    /// Whether every aggregate was read
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Plain-text summary of the dashboard
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        let (top_page, top_visits) = self.top_page();

        let _ = writeln!(out, "Total visitors:   {}", self.total_visitors());
        let _ = writeln!(out, "Today:            {} unique", self.today_visitors());
        let _ = writeln!(out, "Page views today: {}", self.today_page_views());
        let _ = writeln!(out, "Top page:         {} ({} visits)", top_page, top_visits);

        let _ = writeln!(out, "\nTop pages");
        for (rank, page) in self.pages.iter().enumerate() {
            let _ = writeln!(out, "  {:>2}. {:<24} {:>6}", rank + 1, page.page, page.visits);
        }

        let _ = writeln!(out, "\nTraffic sources");
        for share in self.source_shares() {
            write_share(&mut out, &share);
        }

        let _ = writeln!(out, "\nDevices");
        for share in self.device_shares() {
            write_share(&mut out, &share);
        }

        if !self.failed.is_empty() {
            let names: Vec<String> = self.failed.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "\nUnavailable: {}", names.join(", "));
        }

        out
    }
}

fn write_share(out: &mut String, share: &Share) {
    let _ = writeln!(
        out,
        "  {:<24} {:>6} {:>7}",
        share.label,
        share.visits,
        format_percent(share.percent)
    );
}

/// First `n` newest-first rows, reversed into chronological order.
fn chronological<T>(rows: &[T], n: usize) -> Vec<&T> {
    rows.iter().take(n).rev().collect()
}

/// Loads dashboard data for an authenticated admin.
#[derive(Clone)]
pub struct Dashboard {
    backend: Arc<dyn AnalyticsBackend>,
    gate: AuthGate,
    limits: DashboardConfig,
    timeout: Duration,
}

impl Dashboard {
    /// Create a dashboard reading through `backend`, gated by `gate`
    pub fn new(
        backend: Arc<dyn AnalyticsBackend>,
        gate: AuthGate,
        limits: DashboardConfig,
        request_config: &RequestConfig,
    ) -> Self {
        Self {
            backend,
            gate,
            limits,
            timeout: Duration::from_millis(request_config.timeout_ms),
        }
    }

    /// Queries issued by [`Dashboard::load`], in [`AggregateKind`] order.
    pub fn queries(&self) -> [SelectQuery; 6] {
        [
            SelectQuery::new(DAILY_TABLE)
                .order_desc("date")
                .limit(self.limits.daily_limit),
            SelectQuery::new(WEEKLY_TABLE)
                .order_desc("week_start")
                .limit(self.limits.weekly_limit),
            SelectQuery::new(MONTHLY_TABLE)
                .order_desc("month_start")
                .limit(self.limits.monthly_limit),
            SelectQuery::new(PAGES_TABLE)
                .order_desc("visits")
                .limit(self.limits.pages_limit),
            SelectQuery::new(SOURCES_TABLE).order_desc("visits"),
            SelectQuery::new(DEVICES_TABLE).order_desc("visits"),
        ]
    }

    async fn fetch<T: DeserializeOwned>(&self, query: &SelectQuery) -> BackendResult<Vec<T>> {
        let rows = tokio::time::timeout(self.timeout, self.backend.select(query))
            .await
            .map_err(|_| BackendError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| BackendError::InvalidResponse {
                    message: format!("Unexpected row in {}: {}", query.table, e),
                })
            })
            .collect()
    }

    /// Read all six aggregates concurrently.
    pub async fn load(&self) -> Result<DashboardData, DashboardError> {
        if !self.gate.is_authenticated().await {
            return Err(DashboardError::NotAuthenticated);
        }

        let start = Instant::now();
        let [daily_q, weekly_q, monthly_q, pages_q, sources_q, devices_q] = self.queries();

        let (daily, weekly, monthly, pages, sources, devices) = tokio::join!(
            self.fetch::<DailyVisitAggregate>(&daily_q),
            self.fetch::<WeeklyVisitAggregate>(&weekly_q),
            self.fetch::<MonthlyVisitAggregate>(&monthly_q),
            self.fetch::<PageAggregate>(&pages_q),
            self.fetch::<SourceAggregate>(&sources_q),
            self.fetch::<DeviceAggregate>(&devices_q),
        );

        let mut failed = Vec::new();
        let data = DashboardData {
            daily: settle(AggregateKind::Daily, daily, &mut failed),
            weekly: settle(AggregateKind::Weekly, weekly, &mut failed),
            monthly: settle(AggregateKind::Monthly, monthly, &mut failed),
            pages: settle(AggregateKind::Pages, pages, &mut failed),
            sources: settle(AggregateKind::Sources, sources, &mut failed),
            devices: settle(AggregateKind::Devices, devices, &mut failed),
            failed,
        };

        info!(
            total_visitors = data.total_visitors(),
            failed = data.failed.len(),
            latency_ms = start.elapsed().as_millis(),
            "Dashboard data loaded"
        );
        Ok(data)
    }
}

fn settle<T>(
    kind: AggregateKind,
    result: BackendResult<Vec<T>>,
    failed: &mut Vec<AggregateKind>,
) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(aggregate = %kind, error = %e, "Error loading analytics aggregate");
        failed.push(kind);
        Vec::new()
    })
}
