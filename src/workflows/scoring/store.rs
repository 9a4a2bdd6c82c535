use std::collections::BTreeMap;
use std::sync::Mutex;

use super::domain::{RuleId, ScoringRule};

/// Storage abstraction for administrator-managed rules. The engine reads the
/// collection wholesale before each scoring pass; there is no incremental
/// sync.
pub trait RuleStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<ScoringRule>, RuleStoreError>;
    fn upsert(&self, rule: ScoringRule) -> Result<(), RuleStoreError>;
    fn remove(&self, id: &RuleId) -> Result<(), RuleStoreError>;
}

/// Error enumeration for rule storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RuleStoreError {
    #[error("rule name '{0}' is already taken")]
    NameTaken(String),
    #[error("rule not found")]
    NotFound,
    #[error("rule store unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-guarded store backing tests, the CLI, and the demo server state.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: Mutex<BTreeMap<String, ScoringRule>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(rules: Vec<ScoringRule>) -> Result<Self, RuleStoreError> {
        let store = Self::new();
        for rule in rules {
            store.upsert(rule)?;
        }
        Ok(store)
    }
}

impl RuleStore for InMemoryRuleStore {
    fn load_all(&self) -> Result<Vec<ScoringRule>, RuleStoreError> {
        let rules = self
            .rules
            .lock()
            .map_err(|_| RuleStoreError::Unavailable("rule store poisoned".to_string()))?;
        Ok(rules.values().cloned().collect())
    }

    fn upsert(&self, rule: ScoringRule) -> Result<(), RuleStoreError> {
        let mut rules = self
            .rules
            .lock()
            .map_err(|_| RuleStoreError::Unavailable("rule store poisoned".to_string()))?;

        // The unique-name constraint is enforced here, at creation time, so
        // the breakdown map can never see two rules sharing a key.
        if rules
            .values()
            .any(|existing| existing.name == rule.name && existing.id != rule.id)
        {
            return Err(RuleStoreError::NameTaken(rule.name));
        }

        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    fn remove(&self, id: &RuleId) -> Result<(), RuleStoreError> {
        let mut rules = self
            .rules
            .lock()
            .map_err(|_| RuleStoreError::Unavailable("rule store poisoned".to_string()))?;
        rules.remove(&id.0).map(|_| ()).ok_or(RuleStoreError::NotFound)
    }
}
