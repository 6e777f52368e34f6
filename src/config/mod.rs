//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SLOTWISE` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment yields an in-memory
//! setup authenticated by a static token from `SLOTWISE_CALENDAR_TOKEN`.
//!
//! # Example
//!
//! ```no_run
//! use slotwise::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod calendar;
mod credentials;
mod database;
mod error;
mod scheduling;
mod store;
mod telemetry;

pub use calendar::CalendarConfig;
pub use credentials::{CredentialsConfig, StrategyKind};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use scheduling::SchedulingConfig;
pub use store::StoreConfig;
pub use telemetry::{LogFormat, TelemetryConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection; absent means in-memory stores only
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Calendar API endpoint and owner calendars
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Ordered credential strategies and their secrets
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Availability limits and call timeouts
    #[serde(default)]
    pub scheduling: SchedulingConfig,

    /// Per-entity fallback policy and seed data
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SLOTWISE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SLOTWISE__DATABASE__URL=...` -> `database.url = ...`
    /// - `SLOTWISE__CREDENTIALS__STRATEGIES=oauth_refresh,static_env` -> ordered list
    /// - `SLOTWISE__CALENDAR__OWNER_CALENDARS__ALICE=alice@example.com` -> map entry
    ///   (keys are lowercased by the loader)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("SLOTWISE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("credentials.strategies"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, section by section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.calendar.validate()?;
        self.credentials.validate()?;
        self.scheduling.validate()?;
        self.store.validate()?;

        // A pool that gives up later than the handler never gets to fall back.
        if self.database.url().is_some()
            && self.database.acquire_timeout() >= self.scheduling.store_timeout()
        {
            return Err(ValidationError::AcquireTimeoutTooLong);
        }
        Ok(())
    }
}
