//! Dynamic rule table
//!
//! Stands in for the browser's declarative rule store. Updates are applied
//! as a unit: every check runs against the would-be table, and nothing
//! changes unless all of them pass (and, when file-backed, the new table
//! reached disk).

use crate::error::{PlatformError, Result};
use crate::fsutil::write_atomic;
use async_trait::async_trait;
use parking_lot::RwLock;
use smartblock_core::host::RuleInstaller;
use smartblock_core::Rule;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Default rule budget of the table
pub const DEFAULT_MAX_RULES: usize = 5000;

/// Bounded, optionally persistent rule table
#[derive(Debug)]
pub struct DynamicRuleTable {
    rules: RwLock<Vec<Rule>>,
    max_rules: usize,
    path: Option<PathBuf>,
    update_lock: tokio::sync::Mutex<()>,
}

impl DynamicRuleTable {
    /// Empty in-memory table
    pub fn new(max_rules: usize) -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            max_rules,
            path: None,
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Table persisted at `path`, loading whatever is already there
    pub async fn open(path: impl AsRef<Path>, max_rules: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rules = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| PlatformError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), rules = rules.len(), "Opened rule table");
        Ok(Self {
            rules: RwLock::new(rules),
            max_rules,
            path: Some(path),
            update_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Rule budget
    pub fn max_rules(&self) -> usize {
        self.max_rules
    }

    /// Number of installed rules
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Whether no rules are installed
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Copy of the installed rules, in installation order
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.read().clone()
    }

    /// Apply an update: remove `remove_ids`, then append `add`
    ///
    /// Unknown ids in `remove_ids` are ignored.
    #[instrument(skip_all, fields(remove = remove_ids.len(), add = add.len()))]
    pub async fn apply(&self, remove_ids: &[u32], add: Vec<Rule>) -> Result<()> {
        let _update = self.update_lock.lock().await;

        let mut next = self.rules();
        let removing: HashSet<u32> = remove_ids.iter().copied().collect();
        next.retain(|r| !removing.contains(&r.id));
        next.extend(add);

        if let Err(e) = self.check(&next) {
            warn!(error = %e, "Rejected rule update");
            return Err(e);
        }

        if let Some(path) = &self.path {
            write_atomic(path, &serde_json::to_vec_pretty(&next)?).await?;
        }

        let count = next.len();
        *self.rules.write() = next;
        info!(rules = count, "Rule table updated");
        Ok(())
    }

    fn check(&self, rules: &[Rule]) -> Result<()> {
        if rules.len() > self.max_rules {
            return Err(PlatformError::QuotaExceeded {
                requested: rules.len(),
                max: self.max_rules,
            });
        }

        let mut seen = HashSet::with_capacity(rules.len());
        for rule in rules {
            if rule.id < 1 {
                return Err(invalid(rule, "id must be at least 1"));
            }
            if rule.condition.url_filter.is_empty() {
                return Err(invalid(rule, "empty urlFilter"));
            }
            if rule.condition.resource_types.is_empty() {
                return Err(invalid(rule, "no resource types"));
            }
            if !seen.insert(rule.id) {
                return Err(PlatformError::DuplicateId(rule.id));
            }
        }
        Ok(())
    }
}

fn invalid(rule: &Rule, reason: &str) -> PlatformError {
    PlatformError::InvalidRule {
        id: rule.id,
        reason: reason.to_string(),
    }
}

impl Default for DynamicRuleTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RULES)
    }
}

#[async_trait]
impl RuleInstaller for DynamicRuleTable {
    async fn update_dynamic_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<Rule>) -> smartblock_core::Result<()> {
        self.apply(&remove_rule_ids, add_rules).await.map_err(Into::into)
    }

    async fn installed_rules(&self) -> smartblock_core::Result<Vec<Rule>> {
        Ok(self.rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartblock_core::rules::ResourceTypes;
    use smartblock_core::RuleCompiler;

    fn rules(domains: &[&str]) -> Vec<Rule> {
        RuleCompiler::default().compile(domains, &[] as &[&str])
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let table = DynamicRuleTable::default();
        let added = rules(&["a.test", "b.test"]);
        table.apply(&[], added.clone()).await.unwrap();
        assert_eq!(table.len(), 2);

        table.apply(&[added[0].id, 424_242], Vec::new()).await.unwrap();
        assert_eq!(table.rules(), vec![added[1].clone()]);
    }

    #[tokio::test]
    async fn test_quota_is_all_or_nothing() {
        let table = DynamicRuleTable::new(2);
        table.apply(&[], rules(&["a.test"])).await.unwrap();

        let result = table.apply(&[], rules(&["b.test", "c.test"])).await;
        assert!(matches!(result, Err(PlatformError::QuotaExceeded { requested: 3, max: 2 })));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let table = DynamicRuleTable::default();
        table.apply(&[], rules(&["a.test"])).await.unwrap();

        let result = table.apply(&[], rules(&["a.test"])).await;
        assert!(matches!(result, Err(PlatformError::DuplicateId(_))));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_rules_rejected() {
        let table = DynamicRuleTable::default();

        let mut zero = rules(&["a.test"]);
        zero[0].id = 0;
        assert!(matches!(table.apply(&[], zero).await, Err(PlatformError::InvalidRule { .. })));

        let mut untyped = rules(&["a.test"]);
        untyped[0].condition.resource_types = ResourceTypes::empty();
        assert!(matches!(table.apply(&[], untyped).await, Err(PlatformError::InvalidRule { .. })));

        let mut unfiltered = rules(&["a.test"]);
        unfiltered[0].condition.url_filter.clear();
        assert!(table.apply(&[], unfiltered).await.is_err());

        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_installer_maps_errors() {
        let table = DynamicRuleTable::new(1);
        let err = table
            .update_dynamic_rules(Vec::new(), rules(&["a.test", "b.test"]))
            .await
            .unwrap_err();
        assert!(matches!(err, smartblock_core::Error::QuotaExceeded { .. }));
    }
}
