//! Check registry.
//!
//! Tracks every check constructed for a run so ids stay unique, and carries
//! the isolation policy handed to each check. One registry per validation
//! run; call `reset` to reuse it.

use crate::config::RunConfig;
use crate::engine::check::{CheckId, CheckInfo, Scope};
use crate::engine::rule::IsolationPolicy;
use crate::VvError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// A registered check as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCheck {
    pub id: CheckId,
    pub description: String,
}

/// Registry of all checks constructed for a run.
#[derive(Debug, Default)]
pub struct CheckRegistry {
    checks: Mutex<BTreeMap<String, RegisteredCheck>>,
    policy: Arc<IsolationPolicy>,
}

impl CheckRegistry {
    /// Create an empty registry that isolates every rule error
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given isolation policy
    pub fn with_policy(policy: IsolationPolicy) -> Self {
        CheckRegistry {
            checks: Mutex::new(BTreeMap::new()),
            policy: Arc::new(policy),
        }
    }

    /// Create an empty registry configured from a run configuration
    pub fn from_config(config: &RunConfig) -> Self {
        Self::with_policy(config.isolation.clone())
    }

    pub fn policy(&self) -> &IsolationPolicy {
        &self.policy
    }

    pub(crate) fn shared_policy(&self) -> Arc<IsolationPolicy> {
        Arc::clone(&self.policy)
    }

    /// Register a check, failing if its id is already taken
    pub fn register(&self, check: &CheckInfo) -> Result<(), VvError> {
        let mut checks = self.checks.lock().unwrap_or_else(PoisonError::into_inner);
        let key = check.id().as_str();
        if checks.contains_key(key) {
            return Err(VvError::DuplicateCheckId {
                id: key.to_string(),
            });
        }

        debug!(check_id = key, "registered check");
        checks.insert(
            key.to_string(),
            RegisteredCheck {
                id: check.id().clone(),
                description: check.description().to_string(),
            },
        );
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<RegisteredCheck> {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered ids, sorted
    pub fn ids(&self) -> Vec<CheckId> {
        self.checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|c| c.id.clone())
            .collect()
    }

    /// Registered ids for one scope, sorted
    pub fn ids_in_scope(&self, scope: Scope) -> Vec<CheckId> {
        self.ids()
            .into_iter()
            .filter(|id| id.scope() == scope)
            .collect()
    }

    /// Forget every registered check. The isolation policy is kept.
    pub fn reset(&self) {
        let mut checks = self.checks.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(count = checks.len(), "resetting check registry");
        checks.clear();
    }
}
