//! OAuth refresh-token strategy.
//!
//! Exchanges a stored refresh token for an access token at the provider's
//! token endpoint (`grant_type=refresh_token`), caches the access token
//! until shortly before it expires, and persists a rotated refresh token
//! when the provider returns one.
//!
//! # Single flight
//!
//! Concurrent callers that find the cache stale queue on one refresh lock.
//! The first performs the exchange; the rest re-check the cache after the
//! lock is released and reuse its result, so the provider sees at most one
//! in-flight refresh per strategy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use crate::ports::{
    Clock, Credential, CredentialError, RefreshTokenStore, RequestContext, SystemClock,
    TokenStrategy,
};

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct OAuthRefreshConfig {
    /// Strategy name, also the key under which the refresh token is stored.
    pub name: String,
    pub token_url: String,
    pub client_id: String,
    client_secret: Secret<String>,
    /// Used when the store has no refresh token yet.
    initial_refresh_token: Option<Secret<String>>,
    /// Treat tokens as expired this long before their real expiry.
    pub expiry_skew: Duration,
    pub request_timeout: Duration,
}

impl OAuthRefreshConfig {
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
    ) -> Self {
        Self {
            name: name.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret,
            initial_refresh_token: None,
            expiry_skew: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_initial_refresh_token(mut self, token: Secret<String>) -> Self {
        self.initial_refresh_token = Some(token);
        self
    }

    pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
        self.expiry_skew = skew;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct RefreshingOAuthStrategy {
    config: OAuthRefreshConfig,
    client: Client,
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
}

impl RefreshingOAuthStrategy {
    pub fn new(config: OAuthRefreshConfig, client: Client, store: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            config,
            client,
            store,
            clock: Arc::new(SystemClock),
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn fresh_cached(&self) -> Option<Credential> {
        let skew = chrono::Duration::from_std(self.config.expiry_skew)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let now = self.clock.now();
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_fresh_at(now, skew))
            .cloned()
    }

    async fn refresh_token(&self) -> Result<Secret<String>, CredentialError> {
        let stored = self
            .store
            .load(&self.config.name)
            .await
            .map_err(|e| CredentialError::failed(&self.config.name, e.to_string()))?;

        stored
            .or_else(|| self.config.initial_refresh_token.clone())
            .ok_or_else(|| CredentialError::not_configured(&self.config.name, "no refresh token stored"))
    }

    async fn exchange(&self, refresh_token: &Secret<String>) -> Result<TokenResponse, CredentialError> {
        let name = &self.config.name;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret().as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CredentialError::failed(name, format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<TokenResponse>()
                .await
                .map_err(|e| CredentialError::failed(name, format!("malformed token response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<TokenErrorResponse>(&body)
            .map(|e| match e.error_description {
                Some(desc) => format!("{}: {}", e.error, desc),
                None => e.error,
            })
            .unwrap_or(body);

        match status.as_u16() {
            400 | 401 | 403 => Err(CredentialError::rejected(name, detail)),
            _ => Err(CredentialError::failed(
                name,
                format!("token endpoint returned {}: {}", status, detail),
            )),
        }
    }
}

#[async_trait]
impl TokenStrategy for RefreshingOAuthStrategy {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn acquire(&self, ctx: &RequestContext) -> Result<Credential, CredentialError> {
        if let Some(credential) = self.fresh_cached().await {
            return Ok(credential);
        }

        let _guard = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(CredentialError::Cancelled),
            guard = self.refresh_lock.lock() => guard,
        };

        // Another caller may have refreshed while we waited.
        if let Some(credential) = self.fresh_cached().await {
            return Ok(credential);
        }

        let refresh_token = self.refresh_token().await?;
        let response = ctx
            .run(self.config.request_timeout, self.exchange(&refresh_token))
            .await
            .map_err(|i| CredentialError::from_interrupted(&self.config.name, i))??;

        if let Some(rotated) = response.refresh_token.filter(|t| !t.is_empty()) {
            if let Err(e) = self.store.save(&self.config.name, &Secret::new(rotated)).await {
                tracing::warn!(
                    strategy = %self.config.name,
                    error = %e,
                    "Failed to persist rotated refresh token"
                );
            }
        }

        let expires_at = match response.expires_in {
            Some(secs) => Some(expiry_after(self.clock.now(), secs).ok_or_else(|| {
                CredentialError::failed(&self.config.name, format!("token lifetime out of range: {}s", secs))
            })?),
            None => None,
        };
        let credential = Credential::new(response.access_token, expires_at, &self.config.name);

        *self.cached.write().await = Some(credential.clone());
        tracing::info!(strategy = %self.config.name, "Access token refreshed");

        Ok(credential)
    }

    async fn invalidate(&self, rejected: &Credential) {
        let mut cached = self.cached.write().await;
        if cached.as_ref().is_some_and(|c| c.same_token(rejected)) {
            *cached = None;
            tracing::debug!(strategy = %self.config.name, "Cached access token invalidated");
        }
    }
}

/// `now + secs`, or `None` when the lifetime is negative or unrepresentable.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    if secs < 0 {
        return None;
    }
    chrono::Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::credentials::InMemoryRefreshTokenStore;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> OAuthRefreshConfig {
        OAuthRefreshConfig::new("google", "client-id", Secret::new("client-secret".to_string()))
            .with_token_url(format!("{}/token", server.uri()))
    }

    fn strategy(server: &MockServer, store: Arc<InMemoryRefreshTokenStore>) -> RefreshingOAuthStrategy {
        RefreshingOAuthStrategy::new(config(server), Client::new(), store)
    }

    #[tokio::test]
    async fn exchanges_refresh_token_and_caches_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let strategy = strategy(&server, store);
        let ctx = RequestContext::new();

        let first = strategy.acquire(&ctx).await.unwrap();
        let second = strategy.acquire(&ctx).await.unwrap();

        assert_eq!(first.access_token(), "at-1");
        assert_eq!(second.access_token(), "at-1");
        assert_eq!(first.source(), "google");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "at-shared", "expires_in": 3600 }))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let strategy = Arc::new(strategy(&server, store));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let strategy = strategy.clone();
            handles.push(tokio::spawn(async move {
                strategy.acquire(&RequestContext::new()).await
            }));
        }
        for handle in handles {
            let cred = handle.await.unwrap().unwrap();
            assert_eq!(cred.access_token(), "at-shared");
        }
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "expires_in": 3600,
                "refresh_token": "r-2"
            })))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let strategy = strategy(&server, store.clone());
        strategy.acquire(&RequestContext::new()).await.unwrap();

        let saved = store.load("google").await.unwrap().unwrap();
        assert_eq!(saved.expose_secret(), "r-2");
    }

    #[tokio::test]
    async fn invalid_grant_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let err = strategy(&server, store)
            .acquire(&RequestContext::new())
            .await
            .unwrap_err();

        match err {
            CredentialError::Rejected { reason, .. } => assert!(reason.contains("invalid_grant")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_error_is_strategy_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let err = strategy(&server, store)
            .acquire(&RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::StrategyFailed { .. }));
    }

    #[tokio::test]
    async fn missing_refresh_token_is_not_configured() {
        let server = MockServer::start().await;
        let store = Arc::new(InMemoryRefreshTokenStore::new());
        let err = strategy(&server, store)
            .acquire(&RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn initial_refresh_token_is_used_when_store_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("refresh_token=bootstrap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(&server).with_initial_refresh_token(Secret::new("bootstrap".to_string()));
        let strategy = RefreshingOAuthStrategy::new(
            config,
            Client::new(),
            Arc::new(InMemoryRefreshTokenStore::new()),
        );
        assert!(strategy.acquire(&RequestContext::new()).await.is_ok());
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "expires_in": 3600
            })))
            .expect(2)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let strategy = strategy(&server, store);
        let ctx = RequestContext::new();

        let cred = strategy.acquire(&ctx).await.unwrap();
        strategy.invalidate(&cred).await;
        strategy.acquire(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn invalidating_a_stale_token_keeps_the_fresh_one() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-new",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let strategy = strategy(&server, store);
        let ctx = RequestContext::new();

        strategy.acquire(&ctx).await.unwrap();
        strategy
            .invalidate(&Credential::new("at-old", None, "google"))
            .await;
        let cred = strategy.acquire(&ctx).await.unwrap();
        assert_eq!(cred.access_token(), "at-new");
    }

    #[tokio::test]
    async fn token_within_skew_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-short",
                "expires_in": 30
            })))
            .expect(2)
            .mount(&server)
            .await;

        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let strategy = strategy(&server, store).with_clock(clock);
        let ctx = RequestContext::new();

        // 30s lifetime is inside the default 60s skew, so nothing is reused.
        strategy.acquire(&ctx).await.unwrap();
        strategy.acquire(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn absurd_token_lifetime_fails_the_strategy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-forever",
                "expires_in": i64::MAX
            })))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRefreshTokenStore::with_token("google", "r-1"));
        let err = strategy(&server, store)
            .acquire(&RequestContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CredentialError::StrategyFailed { .. }), "{:?}", err);
    }

    #[test]
    fn expiry_is_bounded() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expiry_after(now, 3600), Some(Utc.with_ymd_and_hms(2030, 1, 1, 1, 0, 0).unwrap()));
        assert_eq!(expiry_after(now, -1), None);
        assert_eq!(expiry_after(now, i64::MAX), None);
    }
}
