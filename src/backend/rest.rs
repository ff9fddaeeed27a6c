use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::{AdminSession, AnalyticsBackend, SelectQuery};
use crate::config::{BackendConfig, RequestConfig};
use crate::error::{BackendError, BackendResult};
use crate::storage::KeyValueStore;

/// Storage key for the persisted admin session.
pub const ADMIN_SESSION_KEY: &str = "admin_session";

/// Client for the hosted backend's REST table API and password auth API
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    request_config: RequestConfig,
    session: Arc<RwLock<Option<AdminSession>>>,
    session_store: Option<Arc<dyn KeyValueStore>>,
}

/// Password grant response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    email: Option<String>,
}

impl RestBackend {
    /// Create a new backend client
    pub fn new(config: &BackendConfig, request_config: RequestConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(BackendError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            request_config,
            session: Arc::new(RwLock::new(None)),
            session_store: None,
        })
    }

    /// Persist the admin session in `store` so it survives restarts
    pub fn with_session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Attach the API key and the bearer token of the active session.
    async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key.clone(),
        };
        builder
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
    }

    async fn send(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                BackendError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(&error_body),
            });
        }

        Ok(response)
    }

    async fn store_session(&self, session: Option<AdminSession>) {
        if let Some(store) = &self.session_store {
            let result = match &session {
                Some(s) => match serde_json::to_string(s) {
                    Ok(raw) => store.set(ADMIN_SESSION_KEY, &raw).await,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize admin session");
                        Ok(())
                    }
                },
                None => store.remove(ADMIN_SESSION_KEY).await,
            };
            if let Err(e) = result {
                warn!(error = %e, "Failed to persist admin session");
            }
        }
        *self.session.write().await = session;
    }

    /// In-memory session, falling back to the persisted one.
    async fn current_session(&self) -> Option<AdminSession> {
        let cached = self.session.read().await.clone();
        match cached {
            Some(session) => Some(session),
            None => self.load_persisted_session().await,
        }
    }

    async fn load_persisted_session(&self) -> Option<AdminSession> {
        let store = self.session_store.as_ref()?;
        match store.get(ADMIN_SESSION_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted admin session");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted admin session");
                None
            }
        }
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["error_description", "msg", "message", "error"] {
            if let Some(message) = value.get(field).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    body.to_string()
}

#[async_trait]
impl AnalyticsBackend for RestBackend {
    async fn insert(&self, table: &str, row: Value) -> BackendResult<()> {
        let start = Instant::now();
        let builder = self
            .client
            .post(self.rest_url(table))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(&vec![row]);

        match self.send(self.authorize(builder).await).await {
            Ok(_) => {
                debug!(
                    table = %table,
                    latency_ms = start.elapsed().as_millis(),
                    "Backend insert succeeded"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    table = %table,
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Backend insert failed"
                );
                Err(e)
            }
        }
    }

    async fn select(&self, query: &SelectQuery) -> BackendResult<Vec<Value>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        if let Some(column) = &query.order_desc {
            params.push(("order".to_string(), format!("{}.desc", column)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        debug!(table = %query.table, limit = ?query.limit, "Selecting backend rows");

        let builder = self.client.get(self.rest_url(&query.table)).query(&params);
        let response = self.send(self.authorize(builder).await).await?;

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                message: format!("Failed to parse rows of {}: {}", query.table, e),
            })
    }

    async fn get_session(&self) -> BackendResult<Option<AdminSession>> {
        match self.current_session().await {
            Some(session) if session.is_expired() => {
                info!("Admin session expired");
                self.store_session(None).await;
                Ok(None)
            }
            Some(session) => {
                *self.session.write().await = Some(session.clone());
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<AdminSession> {
        let url = format!("{}/auth/v1/token", self.base_url);

        info!(email = %email, "Signing in admin user");

        let builder = self
            .client
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "email": email, "password": password }));

        let token: TokenResponse = self
            .send(builder)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                message: format!("Failed to parse token response: {}", e),
            })?;

        let expires_at = match (token.expires_at, token.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(Utc::now() + ChronoDuration::seconds(secs)),
            (None, None) => None,
        };

        let session = AdminSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user_email: token
                .user
                .and_then(|u| u.email)
                .or_else(|| Some(email.to_string())),
        };

        self.store_session(Some(session.clone())).await;
        info!(email = %email, "Admin sign-in succeeded");
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let Some(session) = self.current_session().await else {
            self.store_session(None).await;
            return Ok(());
        };

        let builder = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token));
        let result = self.send(builder).await.map(|_| ());

        // The local session goes away even when the server call fails.
        self.store_session(None).await;
        result
    }
}
