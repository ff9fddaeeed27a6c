//! Device class and traffic source classification.
//!
//! Both classifiers are pure functions of the signals passed in. The
//! [`Environment`] trait supplies those signals at call time.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Viewport widths below this are mobile.
pub const TABLET_MIN_WIDTH: u32 = 768;
/// Viewport widths at or above this are desktop.
pub const DESKTOP_MIN_WIDTH: u32 = 1024;

/// Source label for navigations without a usable referrer.
pub const DIRECT_SOURCE: &str = "Direct";

/// Coarse device class derived from viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Narrower than 768 px.
    Mobile,
    /// 768 px up to 1023 px.
    Tablet,
    /// 1024 px and wider.
    Desktop,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Mobile => write!(f, "mobile"),
            DeviceType::Tablet => write!(f, "tablet"),
            DeviceType::Desktop => write!(f, "desktop"),
        }
    }
}

impl std::str::FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mobile" => Ok(DeviceType::Mobile),
            "tablet" => Ok(DeviceType::Tablet),
            "desktop" => Ok(DeviceType::Desktop),
            _ => Err(format!("Unknown device type: {}", s)),
        }
    }
}

/// Classify a viewport width into a device class.
pub fn classify_device(viewport_width: u32) -> DeviceType {
    if viewport_width < TABLET_MIN_WIDTH {
        DeviceType::Mobile
    } else if viewport_width < DESKTOP_MIN_WIDTH {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

/// Known referrer providers: host substring and display name.
const PROVIDERS: &[(&str, &str)] = &[
    ("google", "Google"),
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("twitter", "Twitter"),
    ("linkedin", "LinkedIn"),
];

/// Classify a referrer URL into a traffic source label.
///
/// Empty, unparseable, or host-less referrers are `"Direct"`. Known
/// providers map to their display name; any other host is returned as-is.
pub fn classify_source(referrer: &str) -> String {
    let referrer = referrer.trim();
    if referrer.is_empty() {
        return DIRECT_SOURCE.to_string();
    }

    let host = match Url::parse(referrer)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
    {
        Some(host) if !host.is_empty() => host,
        _ => return DIRECT_SOURCE.to_string(),
    };

    if let Some((_, name)) = PROVIDERS.iter().find(|(needle, _)| host.contains(needle)) {
        return name.to_string();
    }
    // Twitter's link shortener
    if host == "t.co" || host.ends_with(".t.co") {
        return "Twitter".to_string();
    }

    host
}

/// Browser signals read at the moment a visit is recorded.
pub trait Environment: Send + Sync {
    /// Current viewport width in CSS pixels.
    fn viewport_width(&self) -> u32;
    /// User agent string.
    fn user_agent(&self) -> String;
    /// Referrer URL of the current document, empty when there is none.
    fn referrer(&self) -> String;
}

/// Snapshot of browser signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Viewport width in CSS pixels.
    pub viewport_width: u32,
    /// User agent string.
    pub user_agent: String,
    /// Referrer URL, empty when absent.
    pub referrer: String,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            viewport_width: DESKTOP_MIN_WIDTH,
            user_agent: concat!("grill-analytics/", env!("CARGO_PKG_VERSION")).to_string(),
            referrer: String::new(),
        }
    }
}

/// [`Environment`] whose signals the host updates explicitly.
#[derive(Debug, Default)]
pub struct StaticEnvironment {
    inner: RwLock<EnvironmentSnapshot>,
}

impl StaticEnvironment {
    /// Create an environment from a snapshot
    pub fn new(snapshot: EnvironmentSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Record a viewport resize
    pub fn set_viewport_width(&self, width: u32) {
        if let Ok(mut inner) = self.inner.write() {
            inner.viewport_width = width;
        }
    }

    /// Replace the referrer
    pub fn set_referrer(&self, referrer: impl Into<String>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.referrer = referrer.into();
        }
    }

    /// Copy of the current signals
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        self.inner
            .read()
            .map(|inner| inner.clone())
            .unwrap_or_default()
    }
}

impl Environment for StaticEnvironment {
    fn viewport_width(&self) -> u32 {
        self.snapshot().viewport_width
    }

    fn user_agent(&self) -> String {
        self.snapshot().user_agent
    }

    fn referrer(&self) -> String {
        self.snapshot().referrer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_breakpoints() {
        assert_eq!(classify_device(0), DeviceType::Mobile);
        assert_eq!(classify_device(767), DeviceType::Mobile);
        assert_eq!(classify_device(768), DeviceType::Tablet);
        assert_eq!(classify_device(1023), DeviceType::Tablet);
        assert_eq!(classify_device(1024), DeviceType::Desktop);
        assert_eq!(classify_device(2560), DeviceType::Desktop);
    }

    #[test]
    fn test_device_type_serialization() {
        assert_eq!(
            serde_json::to_string(&DeviceType::Tablet).unwrap(),
            "\"tablet\""
        );
        assert_eq!("Desktop".parse::<DeviceType>(), Ok(DeviceType::Desktop));
        assert!("phablet".parse::<DeviceType>().is_err());
    }

    #[test]
    fn test_direct_source() {
        assert_eq!(classify_source(""), "Direct");
        assert_eq!(classify_source("   "), "Direct");
    }

    #[test]
    fn test_known_providers() {
        assert_eq!(classify_source("https://www.google.com/search?q=x"), "Google");
        assert_eq!(classify_source("https://www.GOOGLE.se/"), "Google");
        assert_eq!(classify_source("https://m.facebook.com/"), "Facebook");
        assert_eq!(classify_source("https://l.instagram.com/?u=x"), "Instagram");
        assert_eq!(classify_source("https://twitter.com/someone"), "Twitter");
        assert_eq!(classify_source("https://t.co/abc123"), "Twitter");
        assert_eq!(classify_source("https://www.linkedin.com/feed"), "LinkedIn");
    }

    #[test]
    fn test_unknown_host_passes_through() {
        assert_eq!(classify_source("https://news.example.com"), "news.example.com");
        assert_eq!(classify_source("https://www.reddit.com/r/food"), "www.reddit.com");
    }

    #[test]
    fn test_malformed_referrer_is_direct() {
        assert_eq!(classify_source("not a url"), "Direct");
        assert_eq!(classify_source("http://"), "Direct");
        assert_eq!(classify_source("about:blank"), "Direct");
        assert_eq!(classify_source("://missing-scheme.com"), "Direct");
    }

    #[test]
    fn test_static_environment_updates() {
        let env = StaticEnvironment::new(EnvironmentSnapshot {
            viewport_width: 500,
            user_agent: "test-agent".to_string(),
            referrer: String::new(),
        });
        assert_eq!(classify_device(env.viewport_width()), DeviceType::Mobile);

        env.set_viewport_width(1200);
        env.set_referrer("https://www.google.com/");
        assert_eq!(classify_device(env.viewport_width()), DeviceType::Desktop);
        assert_eq!(classify_source(&env.referrer()), "Google");
        assert_eq!(env.user_agent(), "test-agent");
    }
}
