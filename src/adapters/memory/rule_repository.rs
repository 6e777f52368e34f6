//! In-memory availability rule store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OwnerId, RuleId};
use crate::domain::scheduling::AvailabilityRule;
use crate::ports::{AvailabilityRuleRepository, RuleAdministration};

/// Rules held in a shared map. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleRepository {
    rules: Arc<RwLock<HashMap<RuleId, AvailabilityRule>>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}

#[async_trait]
impl AvailabilityRuleRepository for InMemoryRuleRepository {
    async fn find_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<AvailabilityRule>, DomainError> {
        let rules = self.rules.read().await;
        let mut owned: Vec<AvailabilityRule> = rules
            .values()
            .filter(|r| &r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            a.open_from
                .cmp(&b.open_from)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(owned)
    }
}

#[async_trait]
impl RuleAdministration for InMemoryRuleRepository {
    async fn upsert(&self, rule: &AvailabilityRule) -> Result<(), DomainError> {
        rule.validate()?;
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn delete(&self, id: &RuleId) -> Result<(), DomainError> {
        match self.rules.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("availability rule", id)),
        }
    }
}
