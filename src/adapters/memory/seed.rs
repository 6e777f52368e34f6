//! Baseline data for the in-memory fallback stores.
//!
//! Loaded from YAML at startup and written into the fallback through
//! `RuleAdministration`, so the fallback answers with known-good rules
//! when the primary store is absent.
//!
//! ```yaml
//! rules:
//!   - owner_id: alice
//!     recurrence: { kind: weekly, days: [Mon, Tue, Wed, Thu, Fri] }
//!     open_from: "09:00:00"
//!     open_until: "17:00:00"
//!     timezone: Europe/Berlin
//!     slot_minutes: 30
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::domain::foundation::DomainError;
use crate::domain::scheduling::AvailabilityRule;
use crate::ports::RuleAdministration;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed data: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("seed rule {index} is invalid: {source}")]
    InvalidRule {
        index: usize,
        #[source]
        source: DomainError,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub rules: Vec<AvailabilityRule>,
}

impl SeedData {
    pub fn from_yaml(yaml: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).await.map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Writes every rule into `store`. Returns how many were written.
    pub async fn apply<S>(&self, store: &S) -> Result<usize, SeedError>
    where
        S: RuleAdministration + ?Sized,
    {
        for (index, rule) in self.rules.iter().enumerate() {
            store
                .upsert(rule)
                .await
                .map_err(|source| SeedError::InvalidRule { index, source })?;
        }
        tracing::info!(rules = self.rules.len(), "Seed data applied");
        Ok(self.rules.len())
    }
}
