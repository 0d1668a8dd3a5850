//! Final rendering stage: console and file reports.

use crate::extension::Extensions;
use crate::types::LintResult;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors raised while writing reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Writing a report file failed.
    #[error("Failed to write report {path}: {source}")]
    Io {
        /// Destination that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Writing to the console failed.
    #[error("Failed to write console report: {0}")]
    Console(#[source] std::io::Error),

    /// A `--report` argument was malformed.
    #[error("Invalid report destination '{0}': expected <id>:<path>")]
    InvalidDestination(String),
}

/// Routes rendered reports to the console and to files.
///
/// Output reports only write when a destination was registered for their id.
/// Renders that are absent or blank produce no write.
#[derive(Debug, Default)]
pub struct ReportWriter {
    destinations: BTreeMap<String, PathBuf>,
}

impl ReportWriter {
    /// Creates a writer without file destinations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes the output report `id` to `path`.
    #[must_use]
    pub fn destination(mut self, id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.destinations.insert(id.into(), path.into());
        self
    }

    /// Parses and adds an `<id>:<path>` destination.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidDestination`] if the id or path is missing.
    pub fn parse_destination(self, spec: &str) -> Result<Self, ReportError> {
        match spec.split_once(':') {
            Some((id, path)) if !id.is_empty() && !path.is_empty() => Ok(self.destination(id, path)),
            _ => Err(ReportError::InvalidDestination(spec.to_string())),
        }
    }

    /// Renders every report and writes non-blank output.
    ///
    /// Returns the files written.
    ///
    /// # Errors
    ///
    /// Returns an error if the console or a destination cannot be written.
    pub fn write(
        &self,
        extensions: &Extensions,
        result: &LintResult,
        console: &mut dyn Write,
    ) -> Result<Vec<PathBuf>, ReportError> {
        for report in extensions.console_reports() {
            match report.render(result) {
                Some(text) if !text.trim().is_empty() => {
                    writeln!(console, "{}", text.trim_end()).map_err(ReportError::Console)?;
                }
                _ => debug!(report = report.id(), "Console report rendered nothing"),
            }
        }

        let mut written = Vec::new();
        for report in extensions.output_reports() {
            let Some(path) = self.destinations.get(report.id()) else {
                debug!(report = report.id(), "No destination for output report");
                continue;
            };
            match report.render(result) {
                Some(text) if !text.trim().is_empty() => {
                    write_file(path, &text)?;
                    info!(report = report.id(), path = %path.display(), "Report written");
                    written.push(path.clone());
                }
                _ => debug!(report = report.id(), "Output report rendered nothing"),
            }
        }
        Ok(written)
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), ReportError> {
    let io_error = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, text).map_err(io_error)
}
