//! Availability rule storage.
//!
//! Read access is all the availability engine needs. Stores that can also
//! be administered implement `RuleAdministration`; the in-memory fallback
//! requires it so seed data can be loaded into it.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OwnerId, RuleId};
use crate::domain::scheduling::AvailabilityRule;

#[async_trait]
pub trait AvailabilityRuleRepository: Send + Sync {
    /// All rules for an owner. An owner with no rules yields an empty list.
    async fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<AvailabilityRule>, DomainError>;
}

#[async_trait]
pub trait RuleAdministration: AvailabilityRuleRepository {
    /// Inserts the rule, or replaces the one with the same id.
    async fn upsert(&self, rule: &AvailabilityRule) -> Result<(), DomainError>;

    /// Removes a rule. `RecordNotFound` if no such rule exists.
    async fn delete(&self, id: &RuleId) -> Result<(), DomainError>;
}
