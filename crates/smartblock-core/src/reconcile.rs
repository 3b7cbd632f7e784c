//! Rule reconciliation
//!
//! Diffs a candidate rule set against the last installed snapshot and
//! pushes the difference to the host. The snapshot only moves after the
//! host accepts an update, so a failed install leaves the engine believing
//! exactly what the host still holds.

use crate::error::{Error, Result};
use crate::host::RuleInstaller;
use crate::rules::Rule;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How candidate and snapshot are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffStrategy {
    /// Compare url filters index by index; any change replaces everything
    #[default]
    Positional,
    /// Compare by rule id; only changed rules are touched
    ById,
}

/// Outcome of a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Installed rules already match
    NoOp,
    /// Remove then add
    Apply {
        /// Ids to remove
        remove_ids: Vec<u32>,
        /// Rules to add
        add_rules: Vec<Rule>,
    },
}

impl Decision {
    /// Whether the host needs to be called
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

/// Result of a reconcile call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing changed, host not called
    Unchanged,
    /// Host accepted an update
    Applied {
        /// Rules removed
        removed: usize,
        /// Rules added
        added: usize,
    },
}

/// Compute the update that brings `installed` to `candidate`
pub fn diff(candidate: &[Rule], installed: &[Rule], strategy: DiffStrategy) -> Decision {
    match strategy {
        DiffStrategy::Positional => diff_positional(candidate, installed),
        DiffStrategy::ById => diff_by_id(candidate, installed),
    }
}

fn diff_positional(candidate: &[Rule], installed: &[Rule]) -> Decision {
    let changed = candidate.len() != installed.len()
        || candidate
            .iter()
            .zip(installed)
            .any(|(new, old)| new.url_filter() != old.url_filter());

    if !changed {
        return Decision::NoOp;
    }

    Decision::Apply {
        remove_ids: installed.iter().map(|r| r.id).collect(),
        add_rules: candidate.to_vec(),
    }
}

fn diff_by_id(candidate: &[Rule], installed: &[Rule]) -> Decision {
    let current: HashMap<u32, &Rule> = installed.iter().map(|r| (r.id, r)).collect();
    let wanted: HashMap<u32, &Rule> = candidate.iter().map(|r| (r.id, r)).collect();

    let remove_ids: Vec<u32> = installed
        .iter()
        .filter(|old| wanted.get(&old.id).map_or(true, |new| *new != *old))
        .map(|r| r.id)
        .collect();

    let add_rules: Vec<Rule> = candidate
        .iter()
        .filter(|new| current.get(&new.id).map_or(true, |old| *old != *new))
        .cloned()
        .collect();

    if remove_ids.is_empty() && add_rules.is_empty() {
        Decision::NoOp
    } else {
        Decision::Apply { remove_ids, add_rules }
    }
}

/// Owns the installed-rule snapshot
#[derive(Debug)]
pub struct Reconciler {
    strategy: DiffStrategy,
    snapshot: RwLock<Arc<Vec<Rule>>>,
    guard: Option<tokio::sync::Mutex<()>>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DiffStrategy::default(), false)
    }
}

impl Reconciler {
    /// Create a reconciler with an empty snapshot
    ///
    /// With `single_flight`, overlapping reconciles run one after another
    /// instead of racing on the snapshot.
    pub fn new(strategy: DiffStrategy, single_flight: bool) -> Self {
        Self {
            strategy,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            guard: single_flight.then(|| tokio::sync::Mutex::new(())),
        }
    }

    /// Diff strategy in use
    pub fn strategy(&self) -> DiffStrategy {
        self.strategy
    }

    /// Last successfully installed rule set
    pub fn snapshot(&self) -> Arc<Vec<Rule>> {
        Arc::clone(&self.snapshot.read())
    }

    /// Seed the snapshot from what the host already holds
    pub fn seed(&self, rules: Vec<Rule>) {
        *self.snapshot.write() = Arc::new(rules);
    }

    /// What reconciling `candidate` would do right now
    pub fn plan(&self, candidate: &[Rule]) -> Decision {
        diff(candidate, &self.snapshot(), self.strategy)
    }

    /// Bring the host in line with `candidate`
    #[instrument(skip_all, fields(candidate = candidate.len(), strategy = ?self.strategy))]
    pub async fn reconcile(&self, candidate: Vec<Rule>, installer: &dyn RuleInstaller) -> Result<ReconcileOutcome> {
        let _flight = match &self.guard {
            Some(guard) => Some(guard.lock().await),
            None => None,
        };

        let (remove_ids, add_rules) = match self.plan(&candidate) {
            Decision::NoOp => {
                debug!("Installed rules up to date");
                return Ok(ReconcileOutcome::Unchanged);
            }
            Decision::Apply { remove_ids, add_rules } => (remove_ids, add_rules),
        };

        let removed = remove_ids.len();
        let added = add_rules.len();

        if let Err(e) = installer.update_dynamic_rules(remove_ids, add_rules).await {
            warn!(error = %e, "Host rejected rule update; keeping previous snapshot");
            return Err(match e {
                Error::Host(_) | Error::QuotaExceeded { .. } => e,
                other => Error::Host(other.to_string()),
            });
        }

        *self.snapshot.write() = Arc::new(candidate);
        info!(removed, added, "Updated blocking rules");
        Ok(ReconcileOutcome::Applied { removed, added })
    }
}
