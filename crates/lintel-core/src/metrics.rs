//! Built-in project statistics.

use crate::extension::{Extension, FileProcessListener};
use crate::tree::SyntaxTree;
use crate::types::{LintResult, ProjectMetric};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metric kind for the number of processed files.
pub const FILES_METRIC: &str = "files";
/// Metric kind for the number of processed lines.
pub const LINES_METRIC: &str = "lines";
/// Metric kind for the number of findings.
pub const FINDINGS_METRIC: &str = "findings";

/// Counts processed files and lines and adds them as project metrics.
#[derive(Debug, Default)]
pub struct ProjectStatistics {
    files: AtomicUsize,
    lines: AtomicUsize,
}

impl ProjectStatistics {
    /// Creates a listener with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extension for ProjectStatistics {
    fn id(&self) -> &str {
        "ProjectStatistics"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn as_file_process_listener(&self) -> Option<&dyn FileProcessListener> {
        Some(self)
    }
}

impl FileProcessListener for ProjectStatistics {
    fn on_start(&self, _files: &[SyntaxTree]) {
        self.files.store(0, Ordering::Relaxed);
        self.lines.store(0, Ordering::Relaxed);
    }

    fn on_process(&self, file: &SyntaxTree) {
        self.files.fetch_add(1, Ordering::Relaxed);
        self.lines.fetch_add(file.line_count(), Ordering::Relaxed);
    }

    fn on_finish(&self, _files: &[SyntaxTree], result: &mut LintResult) {
        let as_metric = |value: usize| i64::try_from(value).unwrap_or(i64::MAX);
        result.add_metric(ProjectMetric::new(
            FILES_METRIC,
            as_metric(self.files.load(Ordering::Relaxed)),
        ));
        result.add_metric(ProjectMetric::new(
            LINES_METRIC,
            as_metric(self.lines.load(Ordering::Relaxed)),
        ));
        let findings = result.finding_count();
        result.add_metric(ProjectMetric::new(FINDINGS_METRIC, as_metric(findings)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    #[test]
    fn counts_files_and_lines() {
        let stats = ProjectStatistics::new();
        let files = vec![
            TreeBuilder::new("a.rs", "fn a() {}\nfn b() {}\n").build(),
            TreeBuilder::new("b.rs", "fn c() {}").build(),
        ];
        stats.on_start(&files);
        for file in &files {
            stats.on_process(file);
        }
        let mut result = LintResult::new();
        stats.on_finish(&files, &mut result);
        assert_eq!(result.metric(FILES_METRIC).map(|m| m.value), Some(2));
        assert_eq!(result.metric(LINES_METRIC).map(|m| m.value), Some(3));
        assert_eq!(result.metric(FINDINGS_METRIC).map(|m| m.value), Some(0));
    }
}
