//! Rule sets, multi rules and the provider hook rule packages implement.

use crate::config::{Config, ConfigError};
use crate::context::AnalysisContext;
use crate::ids::{IdError, RuleId, RuleSetId};
use crate::rule::{execute, PreparedRule, Rule, RuleBox, RuleSetReport};
use crate::tree::SyntaxTree;
use std::collections::HashSet;
use tracing::debug;

/// Errors raised while building a rule set.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    /// A rule's configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A rule or rule set id is invalid.
    #[error(transparent)]
    Id(#[from] IdError),
}

/// A rule that bundles several sub-rules sharing one traversal per file.
///
/// The multi rule itself is never suppressed or filtered; each sub-rule is
/// checked individually and its findings carry the sub-rule's own id.
pub struct MultiRule {
    rules: Vec<PreparedRule>,
}

impl MultiRule {
    /// Bundles `rules`, resolving their configuration.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error of a sub-rule.
    pub fn new(rules: Vec<RuleBox>) -> Result<Self, ConfigError> {
        let rules = rules
            .into_iter()
            .map(PreparedRule::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The sub-rules, in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(PreparedRule::rule)
    }

    fn accept(
        &self,
        rule_set: &RuleSetId,
        tree: &SyntaxTree,
        analysis: &AnalysisContext,
        skip: &HashSet<RuleId>,
    ) -> RuleSetReport {
        let active: Vec<&PreparedRule> = self
            .rules
            .iter()
            .filter(|rule| !skip.contains(rule.id()))
            .filter(|rule| rule.visit_condition(tree, analysis, rule_set))
            .collect();
        execute(&active, rule_set, tree, analysis)
    }
}

/// One entry of a rule set.
pub enum RuleEntry {
    /// A plain rule.
    Single(RuleBox),
    /// A bundle of rules sharing one traversal.
    Multi(MultiRule),
}

impl RuleEntry {
    /// Wraps a plain rule.
    #[must_use]
    pub fn single(rule: impl Rule + 'static) -> Self {
        Self::Single(Box::new(rule))
    }
}

impl From<RuleBox> for RuleEntry {
    fn from(rule: RuleBox) -> Self {
        Self::Single(rule)
    }
}

impl From<MultiRule> for RuleEntry {
    fn from(rule: MultiRule) -> Self {
        Self::Multi(rule)
    }
}

enum PreparedEntry {
    Single(PreparedRule),
    Multi(MultiRule),
}

/// An ordered collection of rules sharing a [`RuleSetId`].
pub struct RuleSet {
    id: RuleSetId,
    entries: Vec<PreparedEntry>,
}

impl RuleSet {
    /// Creates a rule set, resolving every rule's configuration.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error of a rule.
    pub fn new(id: RuleSetId, entries: Vec<RuleEntry>) -> Result<Self, RuleSetError> {
        let entries = entries
            .into_iter()
            .map(|entry| match entry {
                RuleEntry::Single(rule) => PreparedRule::new(rule).map(PreparedEntry::Single),
                RuleEntry::Multi(multi) => Ok(PreparedEntry::Multi(multi)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { id, entries })
    }

    /// The rule set id.
    #[must_use]
    pub fn id(&self) -> &RuleSetId {
        &self.id
    }

    /// All rules, multi rules flattened, in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.prepared().map(PreparedRule::rule)
    }

    /// Ids of the rules that will run.
    pub fn active_rule_ids(&self) -> impl Iterator<Item = &RuleId> {
        self.prepared()
            .filter(|rule| rule.is_active())
            .map(PreparedRule::id)
    }

    /// Number of rules, multi rules flattened.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prepared().count()
    }

    /// Returns true if the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every rule over `tree` in declaration order.
    #[must_use]
    pub fn accept(&self, tree: &SyntaxTree, analysis: &AnalysisContext) -> RuleSetReport {
        self.accept_skipping(tree, analysis, &HashSet::new())
    }

    /// Runs every rule not listed in `skip` over `tree`.
    ///
    /// The skip set is forwarded into multi rules so their sub-rules are
    /// filtered the same way.
    #[must_use]
    pub fn accept_skipping(
        &self,
        tree: &SyntaxTree,
        analysis: &AnalysisContext,
        skip: &HashSet<RuleId>,
    ) -> RuleSetReport {
        let mut report = RuleSetReport::default();
        for entry in &self.entries {
            let part = match entry {
                PreparedEntry::Single(rule) => {
                    if skip.contains(rule.id()) {
                        debug!(rule = %rule.id(), "Skipping rule on request");
                        continue;
                    }
                    if !rule.visit_condition(tree, analysis, &self.id) {
                        continue;
                    }
                    execute(&[rule], &self.id, tree, analysis)
                }
                PreparedEntry::Multi(multi) => multi.accept(&self.id, tree, analysis, skip),
            };
            report.findings.extend(part.findings);
            report.suppressed.extend(part.suppressed);
            report.notifications.extend(part.notifications);
        }
        report
    }

    fn prepared(&self) -> impl Iterator<Item = &PreparedRule> {
        self.entries.iter().flat_map(|entry| match entry {
            PreparedEntry::Single(rule) => std::slice::from_ref(rule).iter(),
            PreparedEntry::Multi(multi) => multi.rules.iter(),
        })
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("id", &self.id)
            .field("rules", &self.rules().map(|r| r.rule_id().as_str()).collect::<Vec<_>>())
            .finish()
    }
}

/// Registration hook of a rule package.
///
/// The analyzer hands [`RuleSetProvider::instance`] the config scope named by
/// [`RuleSetProvider::rule_set_id`]; rules take `config.sub_config(rule_id)`.
pub trait RuleSetProvider: Send + Sync {
    /// Id of the provided rule set, also its config key.
    fn rule_set_id(&self) -> &str;

    /// Builds the rule set from its config scope.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule's configuration is invalid.
    fn instance(&self, config: &Config) -> Result<RuleSet, RuleSetError>;
}
