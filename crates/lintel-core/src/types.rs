//! Core types for findings and analysis results.

use crate::ids::{RuleId, RuleSetId};
use crate::issue::{Debt, Issue, Metric, Severity};
use miette::{Diagnostic, SourceSpan};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    /// File path.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in file (for miette integration).
    pub offset: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl Location {
    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset: 0,
            length: 0,
        }
    }

    /// Sets the byte offset and length for this location.
    #[must_use]
    pub fn with_span(mut self, offset: usize, length: usize) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }

    /// Byte offset one past the end of the span.
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }
}

/// The code element a finding points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Declared name, empty for anonymous elements.
    pub name: String,
    /// Stable description of the element.
    pub signature: String,
    /// Where the element is.
    pub location: Location,
}

/// A rule finding.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Rule that produced the finding.
    pub rule_id: RuleId,
    /// Rule set of the rule, set when the finding is collected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set_id: Option<RuleSetId>,
    /// Effective severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Primary element.
    pub entity: Entity,
    /// Related elements.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Entity>,
    /// Measurements that triggered the finding.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
    /// Effort to fix.
    #[serde(serialize_with = "serialize_debt")]
    pub debt: Debt,
    /// Annotations that silenced the finding; empty when it is reported.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suppress_reasons: Vec<String>,
}

fn serialize_debt<S: serde::Serializer>(debt: &Debt, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(debt)
}

impl Finding {
    /// Creates a finding for `issue` at `entity`.
    ///
    /// Severity starts at the issue's default; the rule set replaces it with
    /// the configured severity when the finding is collected.
    #[must_use]
    pub fn new(issue: &Issue, entity: Entity, message: impl Into<String>) -> Self {
        Self {
            rule_id: issue.id.clone(),
            rule_set_id: None,
            severity: issue.severity,
            message: message.into(),
            entity,
            references: Vec::new(),
            metrics: Vec::new(),
            debt: issue.debt,
            suppress_reasons: Vec::new(),
        }
    }

    /// Adds a related element.
    #[must_use]
    pub fn with_reference(mut self, entity: Entity) -> Self {
        self.references.push(entity);
        self
    }

    /// Adds a metric.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Whether a suppression annotation silenced the finding.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        !self.suppress_reasons.is_empty()
    }

    /// Location of the primary element.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.entity.location
    }

    /// Formats the finding for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let location = self.location();
        let mut output = format!(
            "{} at {}:{}:{}\n",
            self.qualified_id(),
            location.file.display(),
            location.line,
            location.column,
        );
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        for metric in &self.metrics {
            let _ = writeln!(output, "  = metric: {metric}");
        }
        let _ = writeln!(output, "  = debt: {}", self.debt);
        output
    }

    /// `set:id` when the rule set is known, else just the rule id.
    #[must_use]
    pub fn qualified_id(&self) -> String {
        match &self.rule_set_id {
            Some(set) => format!("{set}:{}", self.rule_id),
            None => self.rule_id.to_string(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.location();
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            location.file.display(),
            location.line,
            location.column,
            self.severity,
            self.rule_id,
            self.message
        )
    }
}

/// Converts a Finding to a miette Diagnostic for rich error display.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct FindingDiagnostic {
    message: String,
    #[help]
    help: Option<String>,
    #[label("{label_message}")]
    span: SourceSpan,
    label_message: String,
}

impl From<&Finding> for FindingDiagnostic {
    fn from(f: &Finding) -> Self {
        let help = if f.metrics.is_empty() {
            None
        } else {
            Some(
                f.metrics
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };
        Self {
            message: format!("[{}] {}", f.qualified_id(), f.message),
            help,
            span: SourceSpan::from((f.location().offset, f.location().length)),
            label_message: f.rule_id.to_string(),
        }
    }
}

/// Importance of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Informational.
    Info,
    /// Something the user should look at.
    Warning,
    /// Something went wrong.
    Error,
}

/// A message about the run itself rather than about the analyzed code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// What happened.
    pub message: String,
    /// How important it is.
    pub level: NotificationLevel,
}

impl Notification {
    /// Creates an error notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
        }
    }

    /// Creates a warning notification.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Warning,
        }
    }

    /// Creates an informational notification.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
        }
    }

    /// Returns true for error notifications.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        write!(f, "{level}: {}", self.message)
    }
}

/// A project-level measurement contributed by listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectMetric {
    /// What was measured.
    pub kind: String,
    /// The measurement.
    pub value: i64,
}

impl ProjectMetric {
    /// Creates a metric.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: i64) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }
}

/// Findings grouped by the rule set that produced them.
pub type FindingsMap = BTreeMap<RuleSetId, Vec<Finding>>;

/// Result of running lint analysis.
#[derive(Debug, Default, Serialize)]
pub struct LintResult {
    /// Findings per rule set.
    pub findings: FindingsMap,
    /// Messages about the run (config problems, failing rules, ...).
    pub notifications: Vec<Notification>,
    /// Project metrics contributed by listeners.
    pub metrics: Vec<ProjectMetric>,
    /// Findings silenced by annotations, with their reasons. Not reported.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<Finding>,
    /// Number of files checked.
    pub files_checked: usize,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All findings, in rule set order.
    pub fn all_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.values().flatten()
    }

    /// Total number of findings.
    #[must_use]
    pub fn finding_count(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }

    /// Returns true if there are any error findings.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.all_findings().any(|f| f.severity == Severity::Error)
    }

    /// Returns true if any error notification was raised.
    #[must_use]
    pub fn has_error_notifications(&self) -> bool {
        self.notifications.iter().any(Notification::is_error)
    }

    /// Returns findings filtered by severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.all_findings()
            .filter(|f| f.severity == severity)
            .collect()
    }

    /// Counts findings by severity.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let errors = self.by_severity(Severity::Error).len();
        let warnings = self.by_severity(Severity::Warning).len();
        let infos = self.by_severity(Severity::Info).len();
        (errors, warnings, infos)
    }

    /// Checks if any findings meet or exceed the given severity threshold.
    #[must_use]
    pub fn has_violations_at(&self, severity: Severity) -> bool {
        self.all_findings().any(|f| f.severity >= severity)
    }

    /// Sum of the debt of all findings, `None` if there are none.
    #[must_use]
    pub fn total_debt(&self) -> Option<Debt> {
        self.all_findings()
            .map(|f| f.debt)
            .reduce(|acc, debt| acc + debt)
    }

    /// Appends findings of a rule set, creating its bucket on demand.
    pub fn add_findings(&mut self, rule_set: RuleSetId, findings: Vec<Finding>) {
        if findings.is_empty() {
            return;
        }
        self.findings.entry(rule_set).or_default().extend(findings);
    }

    /// Adds a notification.
    pub fn add_notification(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Adds a project metric.
    pub fn add_metric(&mut self, metric: ProjectMetric) {
        self.metrics.push(metric);
    }

    /// Returns the project metric of the given kind.
    #[must_use]
    pub fn metric(&self, kind: &str) -> Option<&ProjectMetric> {
        self.metrics.iter().find(|m| m.kind == kind)
    }
}
