//! Token Source Port - Interface for obtaining calendar API credentials.
//!
//! A `TokenStrategy` is one way of producing a bearer token (refreshing an
//! OAuth grant, reading an environment variable, a configured secret).
//! A `CredentialProvider` is what callers depend on; the usual
//! implementation is an ordered chain of strategies.
//!
//! # Invalidation
//!
//! When a downstream API rejects a token, the caller passes the rejected
//! credential back through [`CredentialProvider::invalidate`]. Strategies
//! only drop their cache if it still holds that same token, so a token that
//! another request has already refreshed is left alone.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

use super::request_context::{Interrupted, RequestContext};

/// A bearer token plus where it came from.
#[derive(Debug, Clone)]
pub struct Credential {
    access_token: Secret<String>,
    expires_at: Option<DateTime<Utc>>,
    source: String,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            expires_at,
            source: source.into(),
        }
    }

    /// The raw token, for building an `Authorization` header.
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Name of the strategy that produced this credential.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True if the token is still usable `skew` from `now`.
    /// Tokens without an expiry never go stale on their own.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + skew < expires_at,
            None => true,
        }
    }

    /// Same token value, regardless of expiry or source.
    pub fn same_token(&self, other: &Credential) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
    }
}

/// Errors from acquiring a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// The strategy has nothing to offer (no variable, no stored grant).
    #[error("{strategy}: not configured: {reason}")]
    NotConfigured { strategy: String, reason: String },

    /// The token endpoint refused the grant.
    #[error("{strategy}: grant rejected: {reason}")]
    Rejected { strategy: String, reason: String },

    /// Network, timeout or unexpected response from the token endpoint.
    #[error("{strategy}: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// Every strategy in the chain failed.
    #[error("no credential strategy succeeded ({})", .attempts.join("; "))]
    Unavailable { attempts: Vec<String> },

    #[error("credential acquisition cancelled")]
    Cancelled,
}

impl CredentialError {
    pub fn not_configured(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        CredentialError::NotConfigured {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        CredentialError::Rejected {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        CredentialError::StrategyFailed {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    pub fn from_interrupted(strategy: &str, interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => CredentialError::Cancelled,
            Interrupted::TimedOut(after) => {
                CredentialError::failed(strategy, format!("timed out after {:?}", after))
            }
        }
    }
}

/// One way of producing a credential.
#[async_trait]
pub trait TokenStrategy: Send + Sync {
    /// Stable name used in logs and in `Credential::source`.
    fn name(&self) -> &str;

    async fn acquire(&self, ctx: &RequestContext) -> Result<Credential, CredentialError>;

    /// Drops any cached copy of `rejected`. Strategies without a cache ignore this.
    async fn invalidate(&self, _rejected: &Credential) {}
}

/// What the calendar gateway depends on to authenticate.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire(&self, ctx: &RequestContext) -> Result<Credential, CredentialError>;

    async fn invalidate(&self, rejected: &Credential);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_freshness_respects_skew() {
        let now = Utc::now();
        let cred = Credential::new("tok", Some(now + Duration::seconds(30)), "oauth");
        assert!(cred.is_fresh_at(now, Duration::seconds(10)));
        assert!(!cred.is_fresh_at(now, Duration::seconds(60)));
    }

    #[test]
    fn credential_without_expiry_is_always_fresh() {
        let cred = Credential::new("tok", None, "env");
        assert!(cred.is_fresh_at(Utc::now() + Duration::days(365), Duration::minutes(5)));
    }

    #[test]
    fn debug_output_redacts_token() {
        let cred = Credential::new("super-secret-value", None, "env");
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("super-secret-value"));
    }

    #[test]
    fn unavailable_lists_every_attempt() {
        let err = CredentialError::Unavailable {
            attempts: vec!["oauth: expired".into(), "env: unset".into()],
        };
        let message = err.to_string();
        assert!(message.contains("oauth: expired"));
        assert!(message.contains("env: unset"));
    }
}
