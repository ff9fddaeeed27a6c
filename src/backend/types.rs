use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::DeviceType;
use crate::session::SessionId;

/// One page visit, written once to `page_visits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitEvent {
    /// Visited pathname.
    pub page: String,
    /// Visitor's persistent session id.
    pub session_id: SessionId,
    /// Device class at visit time.
    pub device_type: DeviceType,
    /// Classified referrer.
    pub traffic_source: String,
    /// Raw user agent.
    pub user_agent: String,
    /// Raw referrer, empty when absent.
    pub referrer: String,
    /// Client clock at visit time.
    pub timestamp: DateTime<Utc>,
    /// Assigned by the server.
    pub ip_address: Option<String>,
}

/// Row of `analytics_daily`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVisitAggregate {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// Distinct sessions.
    #[serde(default)]
    pub unique_visitors: u64,
    /// Total page views.
    #[serde(default)]
    pub page_views: u64,
}

/// Row of `analytics_weekly`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyVisitAggregate {
    /// First day of the week.
    pub week_start: String,
    /// Distinct sessions.
    #[serde(default)]
    pub unique_visitors: u64,
    /// Total page views.
    #[serde(default)]
    pub page_views: u64,
}

/// Row of `analytics_monthly`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyVisitAggregate {
    /// First day of the month.
    pub month_start: String,
    /// Distinct sessions.
    #[serde(default)]
    pub unique_visitors: u64,
    /// Total page views.
    #[serde(default)]
    pub page_views: u64,
}

/// Row of `analytics_pages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAggregate {
    /// Pathname.
    pub page: String,
    /// Visit count.
    #[serde(default)]
    pub visits: u64,
}

/// Row of `analytics_sources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAggregate {
    /// Traffic source label.
    pub source: String,
    /// Visit count.
    #[serde(default)]
    pub visits: u64,
}

/// Row of `analytics_devices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAggregate {
    /// Device class.
    pub device: String,
    /// Visit count.
    #[serde(default)]
    pub visits: u64,
}

/// Backend-issued admin session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSession {
    /// Bearer token for admin reads.
    pub access_token: String,
    /// Refresh token, kept but never used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry instant, if the backend reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Signed-in admin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl AdminSession {
    /// Create a session with no expiry
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            user_email: None,
        }
    }

    /// Set the expiry instant
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the signed-in user's email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    /// Whether the session has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Read against one backend table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Table name.
    pub table: String,
    /// Column to sort by, newest/largest first.
    pub order_desc: Option<String>,
    /// Maximum rows returned.
    pub limit: Option<u32>,
}

impl SelectQuery {
    /// Select every row of `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            order_desc: None,
            limit: None,
        }
    }

    /// Sort descending by `column`
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order_desc = Some(column.into());
        self
    }

    /// Return at most `limit` rows
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
