//! Built-in console and output reports plus the severity filter.

use lintel_core::{
    ConsoleReport, Extension, FindingDiagnostic, FindingsMap, LintResult, OutputReport,
    ReportingExtension, Severity,
};
use miette::{GraphicalReportHandler, GraphicalTheme, NamedSource};
use std::fmt::Write;
use tracing::{debug, warn};

/// Id of [`TextReport`].
pub const TEXT: &str = "text";
/// Id of [`PrettyReport`].
pub const PRETTY: &str = "pretty";
/// Id of [`JsonReport`].
pub const JSON: &str = "json";
/// Id of [`CompactReport`].
pub const COMPACT: &str = "compact";

/// Plain text console report: every finding, notifications, then a summary.
#[derive(Debug, Default)]
pub struct TextReport {
    color: bool,
}

impl TextReport {
    /// Creates the report, coloring the summary line when `color` is set.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl Extension for TextReport {
    fn id(&self) -> &str {
        TEXT
    }

    fn incompatible_with(&self) -> Vec<String> {
        vec![PRETTY.to_string()]
    }

    fn as_console_report(&self) -> Option<&dyn ConsoleReport> {
        Some(self)
    }
}

impl ConsoleReport for TextReport {
    fn render(&self, result: &LintResult) -> Option<String> {
        let mut out = String::new();
        for finding in result.all_findings() {
            out.push_str(&finding.format());
            out.push('\n');
        }
        for notification in &result.notifications {
            let _ = writeln!(out, "{notification}");
        }
        if !result.metrics.is_empty() {
            let metrics: Vec<String> = result
                .metrics
                .iter()
                .map(|m| format!("{}={}", m.kind, m.value))
                .collect();
            let _ = writeln!(out, "Statistics: {}", metrics.join(", "));
        }
        let _ = writeln!(out, "{}", summary(result, self.color));
        Some(out)
    }
}

fn summary(result: &LintResult, color: bool) -> String {
    let (errors, warnings, infos) = result.count_by_severity();
    let mut line = format!(
        "Found {errors} error(s), {warnings} warning(s), {infos} info(s) in {} file(s)",
        result.files_checked
    );
    if let Some(debt) = result.total_debt() {
        let _ = write!(line, ", technical debt {debt}");
    }
    if !color {
        return line;
    }
    let code = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };
    format!("{code}{line}\x1b[0m")
}

/// Graphical console report built on miette diagnostics.
///
/// Sources are re-read from disk to draw the labelled snippet; findings
/// whose file cannot be read are rendered without one.
#[derive(Debug)]
pub struct PrettyReport {
    handler: GraphicalReportHandler,
}

impl PrettyReport {
    /// Creates the report with a unicode theme, colored when `color` is set.
    #[must_use]
    pub fn new(color: bool) -> Self {
        let theme = if color {
            GraphicalTheme::unicode()
        } else {
            GraphicalTheme::unicode_nocolor()
        };
        Self {
            handler: GraphicalReportHandler::new_themed(theme),
        }
    }
}

impl Extension for PrettyReport {
    fn id(&self) -> &str {
        PRETTY
    }

    fn as_console_report(&self) -> Option<&dyn ConsoleReport> {
        Some(self)
    }
}

impl ConsoleReport for PrettyReport {
    fn render(&self, result: &LintResult) -> Option<String> {
        let mut out = String::new();
        for finding in result.all_findings() {
            let file = &finding.location().file;
            let diagnostic = FindingDiagnostic::from(finding);
            let rendered = match std::fs::read_to_string(file) {
                Ok(content) => {
                    let report = miette::Report::new(diagnostic)
                        .with_source_code(NamedSource::new(file.display().to_string(), content));
                    self.handler.render_report(&mut out, &*report)
                }
                Err(e) => {
                    debug!(file = %file.display(), error = %e, "Rendering without source");
                    self.handler.render_report(&mut out, &diagnostic)
                }
            };
            if rendered.is_err() {
                warn!(rule = %finding.rule_id, "Failed to render diagnostic");
            }
        }
        for notification in &result.notifications {
            let _ = writeln!(out, "{notification}");
        }
        let _ = writeln!(out, "{}", summary(result, false));
        Some(out)
    }
}

/// The whole result as pretty-printed JSON.
#[derive(Debug, Default)]
pub struct JsonReport {
    console: bool,
}

impl JsonReport {
    /// Creates the report; with `console` it also prints to stdout.
    #[must_use]
    pub fn new(console: bool) -> Self {
        Self { console }
    }

    fn render_json(result: &LintResult) -> Option<String> {
        serde_json::to_string_pretty(result)
            .map_err(|e| warn!(error = %e, "Failed to serialize result"))
            .ok()
    }
}

impl Extension for JsonReport {
    fn id(&self) -> &str {
        JSON
    }

    fn as_console_report(&self) -> Option<&dyn ConsoleReport> {
        self.console.then_some(self as &dyn ConsoleReport)
    }

    fn as_output_report(&self) -> Option<&dyn OutputReport> {
        Some(self)
    }
}

impl ConsoleReport for JsonReport {
    fn render(&self, result: &LintResult) -> Option<String> {
        Self::render_json(result)
    }
}

impl OutputReport for JsonReport {
    fn ending(&self) -> &str {
        "json"
    }

    fn render(&self, result: &LintResult) -> Option<String> {
        Self::render_json(result)
    }
}

/// One line per finding: `file:line:column: severity [rule] message`.
#[derive(Debug, Default)]
pub struct CompactReport {
    console: bool,
}

impl CompactReport {
    /// Creates the report; with `console` it also prints to stdout.
    #[must_use]
    pub fn new(console: bool) -> Self {
        Self { console }
    }

    fn render_lines(result: &LintResult) -> Option<String> {
        let lines: Vec<String> = result.all_findings().map(ToString::to_string).collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

impl Extension for CompactReport {
    fn id(&self) -> &str {
        COMPACT
    }

    fn as_console_report(&self) -> Option<&dyn ConsoleReport> {
        self.console.then_some(self as &dyn ConsoleReport)
    }

    fn as_output_report(&self) -> Option<&dyn OutputReport> {
        Some(self)
    }
}

impl ConsoleReport for CompactReport {
    fn render(&self, result: &LintResult) -> Option<String> {
        Self::render_lines(result)
    }
}

impl OutputReport for CompactReport {
    fn ending(&self) -> &str {
        "txt"
    }

    fn render(&self, result: &LintResult) -> Option<String> {
        Self::render_lines(result)
    }
}

/// Config key inside `[config]` naming the lowest reported severity.
pub const MIN_SEVERITY_KEY: &str = "minSeverity";

/// Drops findings below a severity before anything is rendered.
#[derive(Debug, Clone, Copy)]
pub struct MinSeverityFilter {
    min: Severity,
}

impl MinSeverityFilter {
    /// Keeps findings at `min` or above.
    #[must_use]
    pub fn new(min: Severity) -> Self {
        Self { min }
    }
}

impl Extension for MinSeverityFilter {
    fn id(&self) -> &str {
        "MinSeverityFilter"
    }

    fn as_reporting_extension(&self) -> Option<&dyn ReportingExtension> {
        Some(self)
    }
}

impl ReportingExtension for MinSeverityFilter {
    fn transform_findings(&self, findings: &FindingsMap) -> FindingsMap {
        findings
            .iter()
            .map(|(set, list)| {
                let kept = list
                    .iter()
                    .filter(|f| f.severity >= self.min)
                    .cloned()
                    .collect();
                (set.clone(), kept)
            })
            .collect()
    }

    fn on_final_result(&self, result: &LintResult) {
        debug!(min = %self.min, remaining = result.finding_count(), "Severity filter applied");
    }
}
