//! Integration tests for the REST backend client
//!
//! Tests HTTP wire format using wiremock for request/response mocking.

use std::sync::Arc;

use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use grill_analytics::backend::{AnalyticsBackend, RestBackend, SelectQuery};
use grill_analytics::config::{BackendConfig, RequestConfig};
use grill_analytics::error::BackendError;
use grill_analytics::storage::{KeyValueStore, MemoryStore};

/// Create a test client pointing to mock server
fn create_test_backend(base_url: &str) -> RestBackend {
    let config = BackendConfig {
        base_url: base_url.to_string(),
        anon_key: "anon-key".to_string(),
    };

    RestBackend::new(&config, RequestConfig { timeout_ms: 2000 }).expect("Failed to create client")
}

fn token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": "user-token",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-1",
        "user": { "id": "u1", "email": "admin@example.com" }
    }))
}

#[cfg(test)]
mod table_tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_posts_single_row_array() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/page_visits"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .and(header("Prefer", "return=minimal"))
            .and(body_json(json!([{ "page": "/meny", "ip_address": null }])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        let result = backend
            .insert("page_visits", json!({ "page": "/meny", "ip_address": null }))
            .await;

        assert!(result.is_ok(), "Insert should succeed: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_insert_validation_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/page_visits"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "23502",
                "message": "null value in column \"page\" violates not-null constraint"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        let err = backend
            .insert("page_visits", json!({}))
            .await
            .unwrap_err();

        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("not-null constraint"));
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_select_sends_order_and_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/analytics_daily"))
            .and(query_param("select", "*"))
            .and(query_param("order", "date.desc"))
            .and(query_param("limit", "30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "date": "2024-05-02", "unique_visitors": 14, "page_views": 40 },
                { "date": "2024-05-01", "unique_visitors": 9, "page_views": 21 }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        let rows = backend
            .select(&SelectQuery::new("analytics_daily").order_desc("date").limit(30))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["unique_visitors"], 14);
    }

    #[tokio::test]
    async fn test_select_rejects_non_array_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/analytics_sources"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        let result = backend
            .select(&SelectQuery::new("analytics_sources").order_desc("visits"))
            .await;

        assert!(matches!(result, Err(BackendError::InvalidResponse { .. })));
    }
}

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_opens_session_and_authorizes_reads() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({ "email": "admin@example.com", "password": "pw" })))
            .respond_with(token_response())
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/analytics_devices"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        assert!(backend.get_session().await.unwrap().is_none());

        let session = backend
            .sign_in_with_password("admin@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(session.access_token, "user-token");
        assert_eq!(session.user_email.as_deref(), Some("admin@example.com"));
        assert!(!session.is_expired());

        assert!(backend.get_session().await.unwrap().is_some());
        backend
            .select(&SelectQuery::new("analytics_devices"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sign_in_failure_keeps_backend_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        let err = backend
            .sign_in_with_password("admin@example.com", "wrong")
            .await
            .unwrap_err();

        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("Expected API error, got {:?}", other),
        }
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_revokes_and_clears_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(token_response())
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        backend
            .sign_in_with_password("admin@example.com", "pw")
            .await
            .unwrap();

        backend.sign_out().await.unwrap();
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_local_session_when_server_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(token_response())
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let backend = create_test_backend(&mock_server.uri());
        backend
            .sign_in_with_password("admin@example.com", "pw")
            .await
            .unwrap();

        assert!(backend.sign_out().await.is_err());
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_survives_restart_through_store() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(token_response())
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryStore::new());

        let first = create_test_backend(&mock_server.uri()).with_session_store(store.clone());
        first
            .sign_in_with_password("admin@example.com", "pw")
            .await
            .unwrap();
        assert!(store.get("admin_session").await.unwrap().is_some());

        let second = create_test_backend(&mock_server.uri()).with_session_store(store.clone());
        let restored = second.get_session().await.unwrap();
        assert_eq!(restored.map(|s| s.access_token), Some("user-token".to_string()));
    }
}
