//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use grill_analytics::config::{Config, DashboardConfig, LogFormat};
use serial_test::serial;
use std::env;

fn set_required() {
    env::set_var("BACKEND_URL", "https://example.supabase.co");
    env::set_var("BACKEND_ANON_KEY", "anon-key");
}

#[test]
#[serial]
fn test_config_requires_backend_url() {
    set_required();
    env::remove_var("BACKEND_URL");

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("BACKEND_URL is required"));

    set_required();
}

#[test]
#[serial]
fn test_config_defaults() {
    set_required();
    for key in [
        "STORAGE_PATH",
        "STORAGE_MAX_CONNECTIONS",
        "LOG_FORMAT",
        "REQUEST_TIMEOUT_MS",
        "DASHBOARD_DAILY_LIMIT",
        "DASHBOARD_WEEKLY_LIMIT",
        "DASHBOARD_MONTHLY_LIMIT",
        "DASHBOARD_PAGES_LIMIT",
    ] {
        env::remove_var(key);
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.backend.base_url, "https://example.supabase.co");
    assert_eq!(config.backend.anon_key, "anon-key");
    assert_eq!(config.storage.path.to_str().unwrap(), "./data/client.db");
    assert_eq!(config.storage.max_connections, 5);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.request.timeout_ms, 10_000);
    assert_eq!(config.dashboard, DashboardConfig::default());
}

#[test]
#[serial]
fn test_config_from_env_overrides() {
    set_required();
    env::set_var("STORAGE_PATH", "/custom/client.db");
    env::set_var("LOG_FORMAT", "json");
    env::set_var("REQUEST_TIMEOUT_MS", "2500");
    env::set_var("DASHBOARD_DAILY_LIMIT", "7");

    let config = Config::from_env().unwrap();
    assert_eq!(config.storage.path.to_str().unwrap(), "/custom/client.db");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.request.timeout_ms, 2500);
    assert_eq!(config.dashboard.daily_limit, 7);
    assert_eq!(config.dashboard.weekly_limit, 12);

    env::remove_var("STORAGE_PATH");
    env::remove_var("LOG_FORMAT");
    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("DASHBOARD_DAILY_LIMIT");
}

#[test]
#[serial]
fn test_config_ignores_unparseable_numbers() {
    set_required();
    env::set_var("REQUEST_TIMEOUT_MS", "soon");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 10_000);

    env::remove_var("REQUEST_TIMEOUT_MS");
}
