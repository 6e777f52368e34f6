//! Fallback policy shared by the resilient repositories.

use serde::Deserialize;

use crate::domain::foundation::DomainError;

/// What a resilient repository does when the primary store is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Re-issue the call against the in-memory fallback.
    #[default]
    Degrade,
    /// Surface the primary store's error unchanged.
    Propagate,
}

impl FallbackPolicy {
    pub fn degrades(&self) -> bool {
        matches!(self, FallbackPolicy::Degrade)
    }

    /// True if `err` should be swallowed and the call re-run on the fallback.
    pub fn should_fall_back(&self, err: &DomainError) -> bool {
        self.degrades() && err.is_store_absent()
    }
}

pub(crate) fn log_fallback(entity: &'static str, operation: &'static str, err: &DomainError) {
    tracing::warn!(
        entity,
        operation,
        code = %err.code,
        error = %err.message,
        "Primary store unavailable, serving from in-memory fallback"
    );
}
