//! Rule compiler
//!
//! Turns a blocked-domain list and allow patterns into a candidate rule set.
//! Compilation is pure: the same inputs always give the same rules in the
//! same order.

use super::{excluded_domains, ResourceTypes, Rule};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Compiles domains into dynamic block rules
#[derive(Debug, Clone, Default)]
pub struct RuleCompiler {
    resource_types: ResourceTypes,
}

impl RuleCompiler {
    /// Create a compiler emitting rules for the given resource types
    pub fn new(resource_types: ResourceTypes) -> Self {
        Self { resource_types }
    }

    /// Resource types attached to every rule
    pub fn resource_types(&self) -> ResourceTypes {
        self.resource_types
    }

    /// Compile one rule per domain
    ///
    /// Every rule shares the excluded-domain set derived from
    /// `allow_patterns`. Empty domains are skipped. Rules are unique by id:
    /// a repeated domain is dropped silently, and a different domain that
    /// hashes to an id already taken is dropped with a warning.
    #[instrument(skip_all, fields(domains = domains.len(), patterns = allow_patterns.len()))]
    pub fn compile<D, P>(&self, domains: &[D], allow_patterns: &[P]) -> Vec<Rule>
    where
        D: AsRef<str>,
        P: AsRef<str>,
    {
        let excluded = excluded_domains(allow_patterns);
        let mut seen: HashMap<u32, String> = HashMap::with_capacity(domains.len());
        let mut rules = Vec::with_capacity(domains.len());

        for raw in domains {
            let Some(domain) = normalize_domain(raw.as_ref()) else {
                continue;
            };

            let rule = Rule::block(&domain, excluded.clone(), self.resource_types);
            if let Some(existing) = seen.get(&rule.id) {
                if *existing != domain {
                    warn!(id = rule.id, kept = %existing, dropped = %domain, "Rule id collision");
                }
                continue;
            }

            seen.insert(rule.id, domain);
            rules.push(rule);
        }

        debug!(rules = rules.len(), excluded = excluded.len(), "Compiled rule set");
        rules
    }
}

/// Canonical form of a blocked domain, or `None` if nothing is left
pub fn normalize_domain(domain: &str) -> Option<String> {
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}
