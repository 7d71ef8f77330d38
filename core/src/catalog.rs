//! Rule catalog
//!
//! Every rule the server defines, fetched once per session and referenced
//! read-only afterwards.

use crate::types::*;
use std::collections::HashMap;
use tracing::warn;

/// Immutable, indexed list of all rules known to the server
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    by_id: HashMap<RuleId, usize>,
    by_key: HashMap<RuleKey, usize>,
}

impl RuleCatalog {
    /// Build a catalog; the first rule seen for a given key wins
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut by_id = HashMap::with_capacity(rules.len());
        let mut by_key = HashMap::with_capacity(rules.len());

        for (index, rule) in rules.iter().enumerate() {
            by_id.entry(rule.id).or_insert(index);
            if by_key.contains_key(&rule.key()) {
                warn!("Duplicate rule definition for {}, keeping the first", rule.key());
            } else {
                by_key.insert(rule.key(), index);
            }
        }

        Self {
            rules,
            by_id,
            by_key,
        }
    }

    /// All rules in server order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up a rule by id
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.by_id.get(&id).map(|&index| &self.rules[index])
    }

    /// Look up the rule defined for a (resource, scope, operation) triple
    pub fn find(&self, key: RuleKey) -> Option<&Rule> {
        self.by_key.get(&key).map(|&index| &self.rules[index])
    }

    /// Resolve rule ids to rules, dropping ids the catalog does not know
    pub fn resolve(&self, ids: &[RuleId]) -> Vec<Rule> {
        ids.iter()
            .filter_map(|id| {
                let rule = self.get(*id).copied();
                if rule.is_none() {
                    warn!("Dropping reference to unknown rule {}", id);
                }
                rule
            })
            .collect()
    }
}
