//! Rule traits and per-file rule execution.

use crate::config::{
    Config, ConfigError, ACTIVE_KEY, ALIASES_KEY, AUTO_CORRECT_KEY, IGNORE_ANNOTATED_KEY,
};
use crate::context::AnalysisContext;
use crate::filters::PathFilters;
use crate::ids::{RuleId, RuleSetId};
use crate::issue::{Issue, Metric, Severity};
use crate::suppression::{self, SuppressionTarget};
use crate::tree::{Node, NodeId, NodeKind, SyntaxTree};
use crate::types::{Finding, Notification};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Error raised by a rule while visiting a file.
///
/// Never aborts the run: the failure is isolated to the rule and file and
/// reported as a [`Notification`].
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A property could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The rule could not analyze the file.
    #[error("{0}")]
    Failed(String),
}

impl RuleError {
    /// Creates a [`RuleError::Failed`].
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Configuration derived from a rule's config scope.
///
/// The scope handed to a rule is its rule set scope's `sub_config(rule_id)`,
/// so [`ConfigAware::rule_set_config`] is simply its parent.
pub trait ConfigAware {
    /// Rule metadata.
    fn issue(&self) -> &Issue;

    /// The rule's own config scope.
    fn config(&self) -> &Config;

    /// Rule identifier.
    fn rule_id(&self) -> &RuleId {
        &self.issue().id
    }

    /// The enclosing rule set scope.
    fn rule_set_config(&self) -> Option<&Config> {
        self.config().parent()
    }

    /// Whether the rule runs when its scope does not set `active`.
    fn default_active(&self) -> bool {
        true
    }

    /// Active when both the rule set and the rule are active.
    ///
    /// # Errors
    ///
    /// Returns an error if `active` is not a boolean.
    fn active(&self) -> Result<bool, ConfigError> {
        let rule_set_active = match self.rule_set_config() {
            Some(rule_set) => rule_set.value_or_default(ACTIVE_KEY, true)?,
            None => true,
        };
        Ok(rule_set_active
            && self
                .config()
                .value_or_default(ACTIVE_KEY, self.default_active())?)
    }

    /// Auto-correct when the rule opts in and the rule set does not opt out.
    ///
    /// # Errors
    ///
    /// Returns an error if `autoCorrect` is not a boolean.
    fn auto_correct(&self) -> Result<bool, ConfigError> {
        let rule_set_allows = match self.rule_set_config() {
            Some(rule_set) => rule_set.value_or_default(AUTO_CORRECT_KEY, true)?,
            None => true,
        };
        Ok(rule_set_allows && self.config().value_or_default(AUTO_CORRECT_KEY, false)?)
    }

    /// Additional names accepted by suppression annotations.
    ///
    /// # Errors
    ///
    /// Returns an error if `aliases` is not a list of strings.
    fn aliases(&self) -> Result<Vec<String>, ConfigError> {
        self.config().value_or_default(ALIASES_KEY, Vec::new())
    }

    /// Effective severity: rule scope, then rule set scope, then the issue default.
    ///
    /// # Errors
    ///
    /// Returns an error naming the key for an unknown severity.
    fn severity(&self) -> Result<Severity, ConfigError> {
        Severity::resolve(self.config(), self.issue().severity)
    }
}

/// A lint rule over the language-neutral [`SyntaxTree`].
///
/// Rules are shared between worker threads and must not keep per-file state:
/// findings go into the [`RuleContext`] handed to every call, which the
/// engine creates fresh for each rule and file.
///
/// # Example
///
/// ```ignore
/// use lintel_core::{Config, ConfigAware, Issue, Node, NodeKind, Rule, RuleContext, RuleError};
///
/// struct NoEmptyBlocks {
///     issue: Issue,
///     config: Config,
/// }
///
/// impl ConfigAware for NoEmptyBlocks {
///     fn issue(&self) -> &Issue { &self.issue }
///     fn config(&self) -> &Config { &self.config }
/// }
///
/// impl Rule for NoEmptyBlocks {
///     fn node_kinds(&self) -> &[NodeKind] { &[NodeKind::Block] }
///
///     fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
///         if node.children().next().is_none() {
///             ctx.report(node, "Empty block");
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Rule: ConfigAware + Send + Sync {
    /// Node kinds this rule wants to see. Empty means every node.
    fn node_kinds(&self) -> &[NodeKind] {
        &[]
    }

    /// Inspects one node.
    ///
    /// # Errors
    ///
    /// Returning an error stops this rule for the current file only.
    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError>;

    /// Called once after the last node of a file.
    ///
    /// # Errors
    ///
    /// Returning an error discards this rule's findings for the file.
    fn finish_file(&self, _ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    /// Whether the rule needs the type-resolution binding of the
    /// [`AnalysisContext`]; such rules are skipped without one.
    fn requires_type_resolution(&self) -> bool {
        false
    }

    /// Resolves the rule's properties eagerly so configuration errors
    /// surface before any file is analyzed.
    ///
    /// # Errors
    ///
    /// Returns the first property error.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;

/// Per-rule, per-file sink for findings.
pub struct RuleContext<'a> {
    tree: &'a SyntaxTree,
    analysis: &'a AnalysisContext,
    issue: &'a Issue,
    auto_correct: bool,
    reports: Vec<(Finding, NodeId)>,
}

impl<'a> RuleContext<'a> {
    /// Creates an empty context for one rule over one file.
    #[must_use]
    pub fn new(
        tree: &'a SyntaxTree,
        analysis: &'a AnalysisContext,
        issue: &'a Issue,
        auto_correct: bool,
    ) -> Self {
        Self {
            tree,
            analysis,
            issue,
            auto_correct,
            reports: Vec::new(),
        }
    }

    /// The file being analyzed.
    #[must_use]
    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    /// The analysis-wide context.
    #[must_use]
    pub fn analysis(&self) -> &'a AnalysisContext {
        self.analysis
    }

    /// Metadata of the running rule.
    #[must_use]
    pub fn issue(&self) -> &'a Issue {
        self.issue
    }

    /// Whether the rule may rewrite code.
    #[must_use]
    pub fn auto_correct(&self) -> bool {
        self.auto_correct
    }

    /// Reports a finding at `node` with the rule's issue.
    pub fn report(&mut self, node: Node<'_>, message: impl Into<String>) {
        let finding = Finding::new(self.issue, node.entity(), message);
        self.reports.push((finding, node.id()));
    }

    /// Reports a threshold finding at `node`.
    pub fn report_metric(&mut self, node: Node<'_>, message: impl Into<String>, metric: Metric) {
        let finding = Finding::new(self.issue, node.entity(), message).with_metric(metric);
        self.reports.push((finding, node.id()));
    }

    /// Reports a prepared finding; `node` is where suppression is looked up.
    pub fn report_finding(&mut self, node: Node<'_>, finding: Finding) {
        self.reports.push((finding, node.id()));
    }

    /// Findings reported so far for this file.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.reports.iter().map(|(finding, _)| finding)
    }

    fn into_reports(self) -> Vec<(Finding, NodeId)> {
        self.reports
    }
}

/// A rule with its configuration resolved once, before analysis starts.
pub(crate) struct PreparedRule {
    rule: RuleBox,
    active: bool,
    auto_correct: bool,
    severity: Severity,
    aliases: Vec<String>,
    filters: PathFilters,
    ignore_annotated: Vec<String>,
}

impl PreparedRule {
    pub(crate) fn new(rule: RuleBox) -> Result<Self, ConfigError> {
        rule.validate()?;
        let ignore_annotated = rule
            .config()
            .value_or_default(IGNORE_ANNOTATED_KEY, Vec::new())?;
        Ok(Self {
            active: rule.active()?,
            auto_correct: rule.auto_correct()?,
            severity: rule.severity()?,
            aliases: rule.aliases()?,
            filters: PathFilters::from_config(rule.config())?,
            ignore_annotated,
            rule,
        })
    }

    pub(crate) fn rule(&self) -> &dyn Rule {
        self.rule.as_ref()
    }

    pub(crate) fn id(&self) -> &RuleId {
        self.rule.rule_id()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    fn target(&self, rule_set: &RuleSetId) -> SuppressionTarget {
        SuppressionTarget::new(self.id().as_str(), &self.aliases)
            .with_rule_set(rule_set.as_str(), self.id().as_str())
    }

    /// Active, not filtered out by path, file root not suppressed, and type
    /// resolution available when required.
    pub(crate) fn visit_condition(
        &self,
        tree: &SyntaxTree,
        analysis: &AnalysisContext,
        rule_set: &RuleSetId,
    ) -> bool {
        if !self.active {
            return false;
        }
        if self.rule.requires_type_resolution() && !analysis.has_binding() {
            debug!(rule = %self.id(), "Skipping rule without type resolution");
            return false;
        }
        if self.filters.is_ignored(tree.path(), analysis.base_path()) {
            debug!(rule = %self.id(), file = %tree.path().display(), "File filtered out for rule");
            return false;
        }
        if let Some(reason) = suppression::is_suppressed(tree.root(), &self.target(rule_set)) {
            debug!(rule = %self.id(), file = %tree.path().display(), %reason, "File suppressed for rule");
            return false;
        }
        true
    }

    /// Stamps severity and rule set; suppressed reports keep their reason.
    fn collect(
        &self,
        reports: Vec<(Finding, NodeId)>,
        tree: &SyntaxTree,
        rule_set: &RuleSetId,
    ) -> Vec<Finding> {
        let target = self.target(rule_set);
        reports
            .into_iter()
            .map(|(mut finding, origin)| {
                if let Some(node) = tree.node(origin) {
                    let reason = suppression::is_suppressed(node, &target)
                        .or_else(|| suppression::is_annotated_with(node, &self.ignore_annotated));
                    if let Some(reason) = reason {
                        debug!(rule = %self.id(), %reason, "Finding suppressed");
                        finding.suppress_reasons.push(reason.to_string());
                    }
                }
                finding.severity = self.severity;
                finding.rule_set_id = Some(rule_set.clone());
                finding
            })
            .collect()
    }
}

/// Maps node kinds to the indices of the rules interested in them.
struct Dispatcher {
    by_kind: Vec<Vec<usize>>,
}

impl Dispatcher {
    fn new<'r>(interests: impl Iterator<Item = &'r [NodeKind]>) -> Self {
        let mut by_kind = vec![Vec::new(); NodeKind::ALL.len()];
        for (index, kinds) in interests.enumerate() {
            if kinds.is_empty() {
                for targets in &mut by_kind {
                    targets.push(index);
                }
            } else {
                for kind in kinds {
                    let targets = &mut by_kind[kind.index()];
                    if !targets.contains(&index) {
                        targets.push(index);
                    }
                }
            }
        }
        Self { by_kind }
    }

    fn targets(&self, kind: NodeKind) -> &[usize] {
        &self.by_kind[kind.index()]
    }
}

/// Findings and notifications produced for one file.
#[derive(Debug, Default)]
pub struct RuleSetReport {
    /// Unsuppressed findings, in rule order.
    pub findings: Vec<Finding>,
    /// Findings silenced by an annotation, each with its reason.
    pub suppressed: Vec<Finding>,
    /// Failures of individual rules.
    pub notifications: Vec<Notification>,
}

/// Runs `rules` over `tree` in a single traversal.
///
/// Each rule gets its own [`RuleContext`]; a rule that errors or panics is
/// dropped for the rest of the file and reported as a notification, while the
/// others keep going.
pub(crate) fn execute(
    rules: &[&PreparedRule],
    rule_set: &RuleSetId,
    tree: &SyntaxTree,
    analysis: &AnalysisContext,
) -> RuleSetReport {
    let mut report = RuleSetReport::default();
    if rules.is_empty() {
        return report;
    }

    let dispatcher = Dispatcher::new(rules.iter().map(|r| r.rule.node_kinds()));
    let mut contexts: Vec<RuleContext<'_>> = rules
        .iter()
        .map(|r| RuleContext::new(tree, analysis, r.rule.issue(), r.auto_correct))
        .collect();
    let mut failures: Vec<Option<String>> = vec![None; rules.len()];

    for node in tree.preorder() {
        for &index in dispatcher.targets(node.kind()) {
            if failures[index].is_some() {
                continue;
            }
            let rule = rules[index].rule();
            let ctx = &mut contexts[index];
            if let Err(message) = guarded(|| rule.visit(node, ctx)) {
                failures[index] = Some(message);
            }
        }
    }

    for (index, prepared) in rules.iter().enumerate() {
        if failures[index].is_none() {
            let ctx = &mut contexts[index];
            if let Err(message) = guarded(|| prepared.rule().finish_file(ctx)) {
                failures[index] = Some(message);
            }
        }
    }

    for ((prepared, ctx), failure) in rules.iter().zip(contexts).zip(failures) {
        match failure {
            Some(message) => {
                warn!(rule = %prepared.id(), file = %tree.path().display(), "Rule failed: {message}");
                report.notifications.push(Notification::error(format!(
                    "Rule '{}' failed on {}: {message}",
                    prepared.id(),
                    tree.path().display()
                )));
            }
            None => {
                for finding in prepared.collect(ctx.into_reports(), tree, rule_set) {
                    if finding.is_suppressed() {
                        report.suppressed.push(finding);
                    } else {
                        report.findings.push(finding);
                    }
                }
            }
        }
    }
    report
}

fn guarded<F: FnOnce() -> Result<(), RuleError>>(f: F) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
