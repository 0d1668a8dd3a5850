//! Extension registry: reports, file listeners and result transforms.
//!
//! Extensions are registered explicitly by the host application. Each one
//! exposes the capabilities it implements through the `as_*` accessors of
//! [`Extension`]; the registry orders them by descending priority (ties keep
//! registration order) and resolves declared incompatibilities before use.

use crate::tree::SyntaxTree;
use crate::types::{FindingsMap, LintResult, Notification};
use std::sync::Arc;
use tracing::warn;

/// A pluggable component of the analysis pipeline.
pub trait Extension: Send + Sync {
    /// Unique id, also used to route output report destinations.
    fn id(&self) -> &str;

    /// Higher runs first within its capability group.
    fn priority(&self) -> i32 {
        0
    }

    /// Ids of extensions that must not be active together with this one.
    fn incompatible_with(&self) -> Vec<String> {
        Vec::new()
    }

    /// Console rendering capability.
    fn as_console_report(&self) -> Option<&dyn ConsoleReport> {
        None
    }

    /// File rendering capability.
    fn as_output_report(&self) -> Option<&dyn OutputReport> {
        None
    }

    /// Per-file lifecycle capability.
    fn as_file_process_listener(&self) -> Option<&dyn FileProcessListener> {
        None
    }

    /// Result transform capability.
    fn as_reporting_extension(&self) -> Option<&dyn ReportingExtension> {
        None
    }
}

/// Renders the result to the console.
pub trait ConsoleReport: Extension {
    /// Rendered text, or `None` when there is nothing to print.
    fn render(&self, result: &LintResult) -> Option<String>;
}

/// Renders the result into a file.
pub trait OutputReport: Extension {
    /// Conventional file extension of the rendered output (`json`, `txt`, ...).
    fn ending(&self) -> &str;

    /// Rendered text, or `None` when there is nothing to write.
    fn render(&self, result: &LintResult) -> Option<String>;
}

/// Observes the analysis lifecycle.
///
/// `on_process` and `on_process_complete` may run concurrently on worker
/// threads; `on_start` and `on_finish` run once on the calling thread.
pub trait FileProcessListener: Extension {
    /// Before any file is processed.
    fn on_start(&self, _files: &[SyntaxTree]) {}

    /// Before the rules run on `file`.
    fn on_process(&self, _file: &SyntaxTree) {}

    /// After the rules ran on `file`.
    fn on_process_complete(&self, _file: &SyntaxTree, _findings: &FindingsMap) {}

    /// After every file was processed, before reporting extensions.
    fn on_finish(&self, _files: &[SyntaxTree], _result: &mut LintResult) {}
}

/// Transforms the result before rendering.
pub trait ReportingExtension: Extension {
    /// Sees the result as produced by the rules and listeners.
    fn on_raw_result(&self, _result: &LintResult) {}

    /// Maps the findings to a new findings map.
    fn transform_findings(&self, findings: &FindingsMap) -> FindingsMap {
        findings.clone()
    }

    /// Sees the result after all transforms.
    fn on_final_result(&self, _result: &LintResult) {}
}

/// Collects extensions in registration order.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension.
    pub fn register<E: Extension + 'static>(&mut self, extension: E) -> &mut Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Registers a shared extension.
    pub fn register_shared(&mut self, extension: Arc<dyn Extension>) -> &mut Self {
        self.extensions.push(extension);
        self
    }

    /// Number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Orders extensions and deactivates conflicting ones.
    ///
    /// Extensions are visited by descending priority, ties in registration
    /// order. One that conflicts with an already accepted extension (declared
    /// on either side) is deactivated and a warning notification names both.
    #[must_use]
    pub fn resolve(self) -> (Extensions, Vec<Notification>) {
        let mut ordered = self.extensions;
        ordered.sort_by_key(|e| std::cmp::Reverse(e.priority()));

        let mut active: Vec<Arc<dyn Extension>> = Vec::with_capacity(ordered.len());
        let mut notifications = Vec::new();
        for candidate in ordered {
            let conflict = active
                .iter()
                .find(|accepted| conflicts(accepted.as_ref(), candidate.as_ref()))
                .map(|accepted| accepted.id().to_string());
            match conflict {
                Some(winner) => {
                    warn!(
                        extension = candidate.id(),
                        conflicts_with = %winner,
                        "Deactivating incompatible extension"
                    );
                    notifications.push(Notification::warning(format!(
                        "Extension '{}' is incompatible with '{winner}' and was deactivated.",
                        candidate.id()
                    )));
                }
                None => active.push(candidate),
            }
        }
        (Extensions { active }, notifications)
    }
}

fn conflicts(a: &dyn Extension, b: &dyn Extension) -> bool {
    a.incompatible_with().iter().any(|id| id == b.id())
        || b.incompatible_with().iter().any(|id| id == a.id())
}

/// Active extensions in execution order.
#[derive(Default, Clone)]
pub struct Extensions {
    active: Vec<Arc<dyn Extension>>,
}

impl Extensions {
    /// Ids of the active extensions.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(|e| e.id())
    }

    /// Console reports in execution order.
    pub fn console_reports(&self) -> impl Iterator<Item = &dyn ConsoleReport> {
        self.active.iter().filter_map(|e| e.as_console_report())
    }

    /// Output reports in execution order.
    pub fn output_reports(&self) -> impl Iterator<Item = &dyn OutputReport> {
        self.active.iter().filter_map(|e| e.as_output_report())
    }

    /// File process listeners in execution order.
    pub fn file_process_listeners(&self) -> impl Iterator<Item = &dyn FileProcessListener> {
        self.active.iter().filter_map(|e| e.as_file_process_listener())
    }

    /// Reporting extensions in execution order.
    pub fn reporting_extensions(&self) -> impl Iterator<Item = &dyn ReportingExtension> {
        self.active.iter().filter_map(|e| e.as_reporting_extension())
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Report {
        id: &'static str,
        priority: i32,
        incompatible: Vec<String>,
    }

    impl Report {
        fn new(id: &'static str, priority: i32) -> Self {
            Self {
                id,
                priority,
                incompatible: Vec::new(),
            }
        }
    }

    impl Extension for Report {
        fn id(&self) -> &str {
            self.id
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn incompatible_with(&self) -> Vec<String> {
            self.incompatible.clone()
        }
        fn as_console_report(&self) -> Option<&dyn ConsoleReport> {
            Some(self)
        }
    }

    impl ConsoleReport for Report {
        fn render(&self, _result: &LintResult) -> Option<String> {
            Some(self.id.to_string())
        }
    }

    #[test]
    fn orders_by_priority_then_registration() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(Report::new("three", 3))
            .register(Report::new("one", 1))
            .register(Report::new("two-a", 2))
            .register(Report::new("two-b", 2));
        let (extensions, notifications) = registry.resolve();
        let order: Vec<&str> = extensions.console_reports().map(|r| r.id()).collect();
        assert_eq!(order, vec!["three", "two-a", "two-b", "one"]);
        assert!(notifications.is_empty());
    }

    #[test]
    fn conflict_keeps_higher_priority() {
        let mut low = Report::new("low", 2);
        low.incompatible = vec!["high".to_string()];
        let mut registry = ExtensionRegistry::new();
        registry.register(low).register(Report::new("high", 5));
        let (extensions, notifications) = registry.resolve();
        assert_eq!(extensions.ids().collect::<Vec<_>>(), vec!["high"]);
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].message.contains("'low'"));
        assert!(notifications[0].message.contains("'high'"));
    }

    #[test]
    fn conflict_with_tied_priority_keeps_first_registered() {
        let mut first = Report::new("first", 1);
        first.incompatible = vec!["second".to_string()];
        let mut registry = ExtensionRegistry::new();
        registry.register(first).register(Report::new("second", 1));
        let (extensions, _) = registry.resolve();
        assert_eq!(extensions.ids().collect::<Vec<_>>(), vec!["first"]);
    }

    #[test]
    fn capabilities_are_opt_in() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Report::new("console", 0));
        let (extensions, _) = registry.resolve();
        assert_eq!(extensions.console_reports().count(), 1);
        assert_eq!(extensions.output_reports().count(), 0);
        assert_eq!(extensions.file_process_listeners().count(), 0);
        assert_eq!(extensions.reporting_extensions().count(), 0);
    }
}
