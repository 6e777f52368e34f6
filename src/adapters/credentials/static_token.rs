//! Static token strategies: a token from an environment variable or from
//! configuration. Neither caches anything, so invalidation is a no-op and
//! the environment is re-read on every acquire.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};

use crate::ports::{Credential, CredentialError, RequestContext, TokenStrategy};

#[derive(Debug, Clone)]
enum TokenOrigin {
    Env(String),
    Secret(Secret<String>),
}

#[derive(Debug, Clone)]
pub struct StaticTokenStrategy {
    name: String,
    origin: TokenOrigin,
}

impl StaticTokenStrategy {
    /// Reads the token from `var` each time one is requested.
    pub fn from_env(name: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: TokenOrigin::Env(var.into()),
        }
    }

    /// Serves a fixed, pre-issued token.
    pub fn from_secret(name: impl Into<String>, token: Secret<String>) -> Self {
        Self {
            name: name.into(),
            origin: TokenOrigin::Secret(token),
        }
    }
}

#[async_trait]
impl TokenStrategy for StaticTokenStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn acquire(&self, _ctx: &RequestContext) -> Result<Credential, CredentialError> {
        let token = match &self.origin {
            TokenOrigin::Env(var) => std::env::var(var).map_err(|_| {
                CredentialError::not_configured(&self.name, format!("{} is not set", var))
            })?,
            TokenOrigin::Secret(secret) => secret.expose_secret().clone(),
        };

        if token.trim().is_empty() {
            return Err(CredentialError::not_configured(&self.name, "token is empty"));
        }

        Ok(Credential::new(token.trim(), None, &self.name))
    }
}
