//! Dynamic blocking rules
//!
//! Rule model in the host's dynamic-rule wire shape, the content-derived
//! rule identifier, and the compiler that turns domain lists and allow
//! patterns into a candidate rule set.

mod allowlist;
mod compiler;
mod resource;

pub use allowlist::{allow_pattern_for, excluded_domains, pattern_host, MatchPattern};
pub use compiler::{normalize_domain, RuleCompiler};
pub use resource::ResourceTypes;

use serde::{Deserialize, Serialize};

/// Priority assigned to every compiled block rule
pub const DEFAULT_RULE_PRIORITY: u32 = 1;

/// Prefix anchoring a URL filter to a domain and its subdomains
pub const DOMAIN_ANCHOR: &str = "||";

/// A single dynamic blocking rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Content-derived identifier, always `>= 1`
    pub id: u32,
    /// Host evaluation priority
    pub priority: u32,
    /// What the host does on match
    pub action: RuleAction,
    /// When the rule matches
    pub condition: RuleCondition,
}

/// Rule action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    /// Cancel the request
    Block,
    /// Let the request through, overriding lower-priority blocks
    Allow,
}

/// Rule match condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    /// `||domain` style filter
    pub url_filter: String,
    /// Initiator domains the rule never applies to
    #[serde(default)]
    pub excluded_domains: Vec<String>,
    /// Request kinds the rule covers
    pub resource_types: ResourceTypes,
}

impl Rule {
    /// Build a block rule for `domain`
    ///
    /// The id is derived from the domain text, so the same domain always
    /// produces the same id across runs.
    pub fn block(domain: &str, excluded_domains: Vec<String>, resource_types: ResourceTypes) -> Self {
        Self {
            id: rule_id(domain),
            priority: DEFAULT_RULE_PRIORITY,
            action: RuleAction::Block,
            condition: RuleCondition {
                url_filter: format!("{DOMAIN_ANCHOR}{domain}"),
                excluded_domains,
                resource_types,
            },
        }
    }

    /// URL filter of the rule
    pub fn url_filter(&self) -> &str {
        &self.condition.url_filter
    }

    /// Domain the rule blocks, if the filter is domain-anchored
    pub fn domain(&self) -> Option<&str> {
        self.condition.url_filter.strip_prefix(DOMAIN_ANCHOR)
    }
}

/// 32-bit rolling string hash (`h = h * 31 + byte`, wrapping)
pub fn rolling_hash32(input: &str) -> i32 {
    input.bytes().fold(0i32, |h, b| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(b))
    })
}

/// Stable rule identifier for a domain
///
/// Folds the rolling hash into `1..=i32::MAX`; the host rejects ids below 1.
pub fn rule_id(domain: &str) -> u32 {
    let folded = rolling_hash32(domain).unsigned_abs() % (i32::MAX as u32);
    folded + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rolling_hash_known_values() {
        assert_eq!(rolling_hash32(""), 0);
        assert_eq!(rolling_hash32("a"), 97);
        assert_eq!(rolling_hash32("ab"), 97 * 31 + 98);
    }

    #[test]
    fn test_rule_id_is_positive() {
        for domain in ["", "a", "doubleclick.net", "facebook.com"] {
            assert!(rule_id(domain) >= 1);
        }
    }

    #[test]
    fn test_block_rule_shape() {
        let rule = Rule::block("doubleclick.net", vec!["example.com".into()], ResourceTypes::default());
        assert_eq!(rule.url_filter(), "||doubleclick.net");
        assert_eq!(rule.domain(), Some("doubleclick.net"));
        assert_eq!(rule.priority, DEFAULT_RULE_PRIORITY);
        assert_eq!(rule.action, RuleAction::Block);
        assert_eq!(rule.id, rule_id("doubleclick.net"));
    }

    #[test]
    fn test_rule_wire_format() {
        let rule = Rule::block("ads.example", vec![], ResourceTypes::SCRIPT | ResourceTypes::IMAGE);
        let json = serde_json::to_value(&rule).unwrap();

        assert_eq!(json["action"]["type"], "block");
        assert_eq!(json["condition"]["urlFilter"], "||ads.example");
        assert_eq!(json["condition"]["resourceTypes"], serde_json::json!(["script", "image"]));

        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    proptest! {
        #[test]
        fn prop_rule_id_deterministic(domain in "[a-z0-9.-]{0,64}") {
            prop_assert_eq!(rule_id(&domain), rule_id(&domain));
            prop_assert!(rule_id(&domain) >= 1);
            prop_assert!(rule_id(&domain) <= i32::MAX as u32);
        }
    }
}
