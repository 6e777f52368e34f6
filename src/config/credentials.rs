//! Credential strategy configuration
//!
//! `strategies` is an ordered list; the token chain tries them in this
//! order and stops at the first that yields a credential.

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::credentials::GOOGLE_TOKEN_URL;

use super::error::ValidationError;

/// One way of obtaining a calendar bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Refresh-token exchange against the OAuth token endpoint
    OauthRefresh,
    /// Token read from an environment variable on every acquire
    StaticEnv,
    /// Token held in configuration
    StaticSecret,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::OauthRefresh => "oauth_refresh",
            StrategyKind::StaticEnv => "static_env",
            StrategyKind::StaticSecret => "static_secret",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,

    #[serde(default)]
    pub oauth_client_id: Option<String>,

    #[serde(default)]
    pub oauth_client_secret: Option<Secret<String>>,

    #[serde(default = "default_token_url")]
    pub oauth_token_url: String,

    /// Refresh token used until one is persisted
    #[serde(default)]
    pub oauth_refresh_token: Option<Secret<String>>,

    /// JSON file holding rotated refresh tokens; in-memory when unset
    #[serde(default)]
    pub refresh_token_path: Option<PathBuf>,

    /// Seconds before expiry at which a cached token counts as stale
    #[serde(default = "default_refresh_skew")]
    pub refresh_skew_secs: u64,

    #[serde(default = "default_token_request_timeout")]
    pub token_request_timeout_secs: u64,

    /// Environment variable read by the `static_env` strategy
    #[serde(default = "default_static_token_env")]
    pub static_token_env: String,

    #[serde(default)]
    pub static_token: Option<Secret<String>>,
}

impl CredentialsConfig {
    pub fn refresh_skew(&self) -> Duration {
        Duration::from_secs(self.refresh_skew_secs)
    }

    pub fn token_request_timeout(&self) -> Duration {
        Duration::from_secs(self.token_request_timeout_secs)
    }

    /// Validate that every listed strategy has what it needs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strategies.is_empty() {
            return Err(ValidationError::NoCredentialStrategies);
        }
        let mut seen = HashSet::new();
        for kind in &self.strategies {
            if !seen.insert(*kind) {
                return Err(ValidationError::DuplicateStrategy(kind.as_str().to_string()));
            }
            match kind {
                StrategyKind::OauthRefresh => self.validate_oauth()?,
                StrategyKind::StaticEnv => {
                    if self.static_token_env.trim().is_empty() {
                        return Err(ValidationError::MissingRequired("credentials.static_token_env"));
                    }
                }
                StrategyKind::StaticSecret => {
                    if !has_value(&self.static_token) {
                        return Err(ValidationError::MissingRequired("credentials.static_token"));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_oauth(&self) -> Result<(), ValidationError> {
        if self.oauth_client_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            return Err(ValidationError::MissingRequired("credentials.oauth_client_id"));
        }
        if !has_value(&self.oauth_client_secret) {
            return Err(ValidationError::MissingRequired("credentials.oauth_client_secret"));
        }
        if !self.oauth_token_url.starts_with("https://") && !self.oauth_token_url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("credentials.oauth_token_url"));
        }
        if !has_value(&self.oauth_refresh_token) && self.refresh_token_path.is_none() {
            return Err(ValidationError::MissingRequired(
                "credentials.oauth_refresh_token or credentials.refresh_token_path",
            ));
        }
        if self.token_request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("credentials.token_request_timeout_secs"));
        }
        Ok(())
    }
}

fn has_value(secret: &Option<Secret<String>>) -> bool {
    secret
        .as_ref()
        .map_or(false, |s| !s.expose_secret().trim().is_empty())
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            oauth_client_id: None,
            oauth_client_secret: None,
            oauth_token_url: default_token_url(),
            oauth_refresh_token: None,
            refresh_token_path: None,
            refresh_skew_secs: default_refresh_skew(),
            token_request_timeout_secs: default_token_request_timeout(),
            static_token_env: default_static_token_env(),
            static_token: None,
        }
    }
}

fn default_strategies() -> Vec<StrategyKind> {
    vec![StrategyKind::StaticEnv]
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_refresh_skew() -> u64 {
    60
}

fn default_token_request_timeout() -> u64 {
    10
}

fn default_static_token_env() -> String {
    "SLOTWISE_CALENDAR_TOKEN".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth_config() -> CredentialsConfig {
        CredentialsConfig {
            strategies: vec![StrategyKind::OauthRefresh, StrategyKind::StaticEnv],
            oauth_client_id: Some("client".to_string()),
            oauth_client_secret: Some(Secret::new("secret".to_string())),
            oauth_refresh_token: Some(Secret::new("refresh".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_is_static_env_only() {
        let config = CredentialsConfig::default();
        assert_eq!(config.strategies, vec![StrategyKind::StaticEnv]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oauth_requires_client_credentials() {
        let config = CredentialsConfig {
            oauth_client_secret: None,
            ..oauth_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("credentials.oauth_client_secret"))
        );
    }

    #[test]
    fn test_oauth_accepts_refresh_token_file_instead_of_token() {
        let config = CredentialsConfig {
            oauth_refresh_token: None,
            refresh_token_path: Some(PathBuf::from("/var/lib/slotwise/tokens.json")),
            ..oauth_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_static_secret_requires_token() {
        let config = CredentialsConfig {
            strategies: vec![StrategyKind::StaticSecret],
            static_token: Some(Secret::new("   ".to_string())),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicates_and_empty_list() {
        let config = CredentialsConfig {
            strategies: vec![StrategyKind::StaticEnv, StrategyKind::StaticEnv],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateStrategy("static_env".to_string()))
        );

        let config = CredentialsConfig {
            strategies: vec![],
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::NoCredentialStrategies));
    }
}
