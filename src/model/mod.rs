//! Policy model interface
//!
//! The model belongs to the evaluation engine. The adapter needs two things
//! from it: an entrypoint to insert a loaded rule, and a view of every rule it
//! holds, grouped by policy type, for full saves.
//!
//! [`MemoryModel`] is a plain implementation used by the CLI and by tests.

use std::collections::BTreeMap;

use crate::rule::PolicyRule;

/// Rules of one policy type, as exposed by a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSection<'a> {
    /// Policy type tag
    pub ptype: &'a str,
    /// Rules in model order
    pub rules: &'a [Vec<String>],
}

/// The engine-owned model, as seen by the adapter
pub trait PolicyModel: Send + Sync {
    /// Insert one rule read from the store
    fn load_rule(&mut self, ptype: &str, rule: Vec<String>);

    /// Every rule the model holds, grouped by policy type
    fn rule_sections(&self) -> Vec<RuleSection<'_>>;
}

/// Section a policy type belongs to: `p` for `p`, `p2`, ...; `g` for `g`,
/// `g2`, ...; other tags form their own section.
pub fn section_of(ptype: &str) -> &str {
    match ptype.chars().next() {
        Some('p') => "p",
        Some('g') => "g",
        _ => ptype,
    }
}

/// In-memory model: section -> ptype -> rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryModel {
    sections: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

impl MemoryModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; returns false if an identical rule is already held
    pub fn add_rule(&mut self, ptype: &str, rule: Vec<String>) -> bool {
        let rules = self
            .sections
            .entry(section_of(ptype).to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default();

        if rules.contains(&rule) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// Remove a rule; returns false if it was not held
    pub fn remove_rule(&mut self, ptype: &str, rule: &[String]) -> bool {
        let Some(rules) = self
            .sections
            .get_mut(section_of(ptype))
            .and_then(|section| section.get_mut(ptype))
        else {
            return false;
        };

        let before = rules.len();
        rules.retain(|r| r.as_slice() != rule);
        before != rules.len()
    }

    /// True if the exact rule is held
    pub fn has_rule(&self, ptype: &str, rule: &[&str]) -> bool {
        self.rules(ptype).iter().any(|r| r.iter().eq(rule.iter()))
    }

    /// Rules of one policy type
    pub fn rules(&self, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(section_of(ptype))
            .and_then(|section| section.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every rule as a flat list, ordered by policy type
    pub fn all_rules(&self) -> Vec<PolicyRule> {
        self.rule_sections()
            .into_iter()
            .flat_map(|section| {
                section
                    .rules
                    .iter()
                    .map(move |r| PolicyRule::new(section.ptype, r.clone()))
            })
            .collect()
    }

    /// Total number of rules
    pub fn len(&self) -> usize {
        self.sections
            .values()
            .flat_map(|section| section.values())
            .map(Vec::len)
            .sum()
    }

    /// True when no rules are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every rule
    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

impl PolicyModel for MemoryModel {
    fn load_rule(&mut self, ptype: &str, rule: Vec<String>) {
        self.add_rule(ptype, rule);
    }

    fn rule_sections(&self) -> Vec<RuleSection<'_>> {
        self.sections
            .values()
            .flat_map(|section| section.iter())
            .map(|(ptype, rules)| RuleSection {
                ptype: ptype.as_str(),
                rules: rules.as_slice(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_section_of() {
        assert_eq!(section_of("p"), "p");
        assert_eq!(section_of("p2"), "p");
        assert_eq!(section_of("g2"), "g");
        assert_eq!(section_of("e"), "e");
        assert_eq!(section_of(""), "");
    }

    #[test]
    fn test_add_rule_deduplicates() {
        let mut model = MemoryModel::new();
        assert!(model.add_rule("p", rule(&["alice", "data1", "read"])));
        assert!(!model.add_rule("p", rule(&["alice", "data1", "read"])));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_sections_group_by_ptype() {
        let mut model = MemoryModel::new();
        model.add_rule("p", rule(&["alice", "data1", "read"]));
        model.add_rule("g", rule(&["alice", "admin"]));
        model.add_rule("g2", rule(&["data2", "data_group"]));

        let sections = model.rule_sections();
        let ptypes: Vec<&str> = sections.iter().map(|s| s.ptype).collect();
        assert_eq!(ptypes, vec!["g", "g2", "p"]);
        assert_eq!(model.all_rules().len(), 3);
    }

    #[test]
    fn test_has_and_remove_rule() {
        let mut model = MemoryModel::new();
        model.add_rule("p", rule(&["bob", "data2", "write"]));
        assert!(model.has_rule("p", &["bob", "data2", "write"]));
        assert!(!model.has_rule("p", &["bob", "data2"]));

        assert!(model.remove_rule("p", &rule(&["bob", "data2", "write"])));
        assert!(!model.remove_rule("p", &rule(&["bob", "data2", "write"])));
        assert!(model.is_empty());
    }

    #[test]
    fn test_load_rule_goes_through_insertion() {
        let mut model = MemoryModel::new();
        model.load_rule("g", rule(&["alice", "data2_admin"]));
        assert_eq!(model.rules("g"), &[rule(&["alice", "data2_admin"])]);
    }
}
