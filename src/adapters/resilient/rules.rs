//! Resilient availability rule repository.

use async_trait::async_trait;

use crate::adapters::memory::InMemoryRuleRepository;
use crate::domain::foundation::{DomainError, OwnerId, RuleId};
use crate::domain::scheduling::AvailabilityRule;
use crate::ports::{AvailabilityRuleRepository, RuleAdministration};

use super::policy::{log_fallback, FallbackPolicy};

/// Wraps a primary rule store. Each call that fails because the store is
/// absent or misconfigured is re-issued against `fallback`. An owner with
/// no rules in the primary is also looked up in the fallback.
pub struct ResilientRuleRepository<P, F = InMemoryRuleRepository> {
    primary: P,
    fallback: F,
    policy: FallbackPolicy,
}

impl<P, F> ResilientRuleRepository<P, F>
where
    P: RuleAdministration,
    F: RuleAdministration,
{
    pub fn new(primary: P, fallback: F, policy: FallbackPolicy) -> Self {
        Self {
            primary,
            fallback,
            policy,
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }
}

#[async_trait]
impl<P, F> AvailabilityRuleRepository for ResilientRuleRepository<P, F>
where
    P: RuleAdministration,
    F: RuleAdministration,
{
    async fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<AvailabilityRule>, DomainError> {
        match self.primary.find_by_owner(owner_id).await {
            Ok(rules) if !rules.is_empty() || !self.policy.degrades() => Ok(rules),
            Ok(_) => {
                tracing::debug!(owner_id = %owner_id, "No rules in primary store, checking fallback");
                self.fallback.find_by_owner(owner_id).await
            }
            Err(e) if self.policy.should_fall_back(&e) => {
                log_fallback("availability_rule", "find_by_owner", &e);
                self.fallback.find_by_owner(owner_id).await
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<P, F> RuleAdministration for ResilientRuleRepository<P, F>
where
    P: RuleAdministration,
    F: RuleAdministration,
{
    async fn upsert(&self, rule: &AvailabilityRule) -> Result<(), DomainError> {
        match self.primary.upsert(rule).await {
            Err(e) if self.policy.should_fall_back(&e) => {
                log_fallback("availability_rule", "upsert", &e);
                self.fallback.upsert(rule).await
            }
            other => other,
        }
    }

    async fn delete(&self, id: &RuleId) -> Result<(), DomainError> {
        match self.primary.delete(id).await {
            Err(e) if self.policy.should_fall_back(&e) => {
                log_fallback("availability_rule", "delete", &e);
                self.fallback.delete(id).await
            }
            other => other,
        }
    }
}
