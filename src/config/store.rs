//! Store fallback configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::adapters::resilient::FallbackPolicy;

use super::error::ValidationError;

/// How each entity's repository behaves when the primary store is absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub rules_policy: FallbackPolicy,

    #[serde(default)]
    pub reservations_policy: FallbackPolicy,

    /// YAML file with baseline rules loaded into the in-memory store
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(path) = &self.seed_path {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::MissingRequired("store.seed_path"));
            }
        }
        Ok(())
    }
}
