//! Core analyzer for orchestrating lint execution.
//!
//! Run phases, each finishing before the next begins:
//!
//! 1. `build`: validate the user config, layer it over the defaults,
//!    instantiate every active rule set (configuration errors abort here),
//!    resolve extensions.
//! 2. `on_start` of every file process listener.
//! 3. Per file, in parallel: `on_process`, every rule set, `on_process_complete`.
//! 4. `on_finish` of every listener.
//! 5. Reporting extensions: `on_raw_result`, `transform_findings` chained in
//!    priority order, `on_final_result`.

use crate::config::{Config, ConfigError, ACTIVE_KEY};
use crate::context::AnalysisContext;
use crate::extension::{Extension, ExtensionRegistry, Extensions};
use crate::filters::PathFilters;
use crate::ids::{IdError, RuleId, RuleSetId};
use crate::rule_set::{RuleSet, RuleSetError, RuleSetProvider};
use crate::tree::SyntaxTree;
use crate::types::{Finding, FindingsMap, LintResult, Notification};
use crate::validation::{validate_config, ValidationSettings};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while setting up an analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A provider declared an invalid rule set id.
    #[error(transparent)]
    Id(#[from] IdError),

    /// A provider built a rule set under a different id than it declared.
    #[error("Rule set provider '{declared}' built rule set '{built}'")]
    RuleSetIdMismatch {
        /// Id the provider declared, used for config lookup.
        declared: String,
        /// Id of the rule set it built.
        built: String,
    },

    /// A rule set could not be instantiated.
    #[error("Failed to load rule set '{id}': {source}")]
    RuleSet {
        /// Rule set id.
        id: String,
        /// Underlying error.
        #[source]
        source: RuleSetError,
    },

    /// The worker pool could not be created.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Builder for configuring an [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    providers: Vec<Box<dyn RuleSetProvider>>,
    config: Option<Config>,
    defaults: Option<Config>,
    validation: Option<ValidationSettings>,
    extensions: ExtensionRegistry,
    parallelism: Option<usize>,
    sequential: bool,
    activate_all_rules: bool,
    auto_correct: bool,
    skip_rules: HashSet<RuleId>,
    context: AnalysisContext,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule set provider.
    #[must_use]
    pub fn provider<P: RuleSetProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Adds boxed rule set providers.
    #[must_use]
    pub fn providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn RuleSetProvider>>,
    {
        self.providers.extend(providers);
        self
    }

    /// Sets the user configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the built-in defaults, used as fallback and validation baseline.
    #[must_use]
    pub fn defaults(mut self, defaults: Config) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Overrides the validation settings read from the user config.
    #[must_use]
    pub fn validation(mut self, settings: ValidationSettings) -> Self {
        self.validation = Some(settings);
        self
    }

    /// Registers an extension.
    #[must_use]
    pub fn extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.register(extension);
        self
    }

    /// Replaces the extension registry.
    #[must_use]
    pub fn extensions(mut self, registry: ExtensionRegistry) -> Self {
        self.extensions = registry;
        self
    }

    /// Sets the number of worker threads (default: one per core).
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Processes files one after another on the calling thread.
    #[must_use]
    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    /// Treats every rule as active unless the user config disables it.
    #[must_use]
    pub fn activate_all_rules(mut self, activate: bool) -> Self {
        self.activate_all_rules = activate;
        self
    }

    /// Allows rules to auto-correct; otherwise `autoCorrect` reads false everywhere.
    #[must_use]
    pub fn auto_correct(mut self, auto_correct: bool) -> Self {
        self.auto_correct = auto_correct;
        self
    }

    /// Skips the given rules for this run.
    #[must_use]
    pub fn skip_rules<I: IntoIterator<Item = RuleId>>(mut self, rules: I) -> Self {
        self.skip_rules.extend(rules);
        self
    }

    /// Sets the analysis context (project root, type binding).
    #[must_use]
    pub fn context(mut self, context: AnalysisContext) -> Self {
        self.context = context;
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule set id or any rule configuration is
    /// invalid, or if the worker pool cannot be created.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let user = self.config.unwrap_or_default();
        let mut notifications = Vec::new();
        if let Some(defaults) = &self.defaults {
            let mut settings = match self.validation {
                Some(settings) => settings,
                None => ValidationSettings::from_config(&user)?,
            };
            // Defaults may name properties they leave unset on purpose.
            settings
                .excludes
                .extend(ValidationSettings::from_config(defaults)?.excludes);
            notifications.extend(validate_config(&user, defaults, &settings));
        }

        let defaults = self.defaults.unwrap_or_default();
        let mut config = if self.activate_all_rules {
            Config::activate_all(user, defaults)
        } else {
            Config::composite(user, defaults)
        };
        if !self.auto_correct {
            config = Config::without_auto_correct(config);
        }

        let mut rule_sets = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let id = RuleSetId::new(provider.rule_set_id())?;
            let scope = config.sub_config(id.as_str());
            if !scope.value_or_default(ACTIVE_KEY, true)? {
                debug!(rule_set = %id, "Skipping inactive rule set");
                continue;
            }
            let filters = PathFilters::from_config(&scope)?;
            let set = provider
                .instance(&scope)
                .map_err(|source| AnalyzerError::RuleSet {
                    id: id.to_string(),
                    source,
                })?;
            if set.id() != &id {
                return Err(AnalyzerError::RuleSetIdMismatch {
                    declared: id.to_string(),
                    built: set.id().to_string(),
                });
            }
            debug!(rule_set = %id, rules = set.len(), "Loaded rule set");
            rule_sets.push(ActiveRuleSet { set, filters });
        }

        let (extensions, conflicts) = self.extensions.resolve();
        notifications.extend(conflicts);

        let pool = if self.sequential {
            None
        } else {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(self.parallelism.unwrap_or(0))
                    .build()?,
            )
        };

        Ok(Analyzer {
            config,
            rule_sets,
            extensions,
            setup_notifications: notifications,
            skip_rules: self.skip_rules,
            context: self.context,
            pool,
        })
    }
}

struct ActiveRuleSet {
    set: RuleSet,
    filters: PathFilters,
}

struct FileOutcome {
    findings: FindingsMap,
    suppressed: Vec<Finding>,
    notifications: Vec<Notification>,
}

/// The main analyzer that orchestrates lint execution.
///
/// Use [`Analyzer::builder()`] to construct an instance.
pub struct Analyzer {
    config: Config,
    rule_sets: Vec<ActiveRuleSet>,
    extensions: Extensions,
    setup_notifications: Vec<Notification>,
    skip_rules: HashSet<RuleId>,
    context: AnalysisContext,
    pool: Option<ThreadPool>,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// The effective configuration (user layered over defaults).
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The instantiated, active rule sets.
    pub fn rule_sets(&self) -> impl Iterator<Item = &RuleSet> {
        self.rule_sets.iter().map(|active| &active.set)
    }

    /// Returns the number of loaded rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rule_sets().map(RuleSet::len).sum()
    }

    /// The active extensions in execution order.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Analyzes `files` and returns the transformed result.
    ///
    /// Never fails: failing rules and extension conflicts surface as
    /// notifications in the result.
    #[must_use]
    pub fn analyze(&self, files: &[SyntaxTree]) -> LintResult {
        info!("Starting analysis of {} files", files.len());

        for listener in self.extensions.file_process_listeners() {
            listener.on_start(files);
        }

        let outcomes: Vec<FileOutcome> = match &self.pool {
            Some(pool) => pool.install(|| files.par_iter().map(|f| self.process_file(f)).collect()),
            None => files.iter().map(|f| self.process_file(f)).collect(),
        };

        let mut result = LintResult::new();
        result.notifications.extend(self.setup_notifications.iter().cloned());
        for outcome in outcomes {
            for (rule_set, findings) in outcome.findings {
                result.add_findings(rule_set, findings);
            }
            result.suppressed.extend(outcome.suppressed);
            result.notifications.extend(outcome.notifications);
        }
        result.files_checked = files.len();

        for listener in self.extensions.file_process_listeners() {
            listener.on_finish(files, &mut result);
        }

        let reporting: Vec<_> = self.extensions.reporting_extensions().collect();
        for extension in &reporting {
            extension.on_raw_result(&result);
        }
        for extension in &reporting {
            result.findings = extension.transform_findings(&result.findings);
        }
        for extension in &reporting {
            extension.on_final_result(&result);
        }

        info!(
            "Analysis complete: {} findings in {} files",
            result.finding_count(),
            result.files_checked
        );
        result
    }

    fn process_file(&self, file: &SyntaxTree) -> FileOutcome {
        debug!("Analyzing: {}", file.path().display());
        for listener in self.extensions.file_process_listeners() {
            listener.on_process(file);
        }

        let mut findings = FindingsMap::new();
        let mut suppressed = Vec::new();
        let mut notifications = Vec::new();
        for active in &self.rule_sets {
            if active.filters.is_ignored(file.path(), self.context.base_path()) {
                debug!(rule_set = %active.set.id(), file = %file.path().display(), "File filtered out");
                continue;
            }
            let report = active
                .set
                .accept_skipping(file, &self.context, &self.skip_rules);
            if !report.findings.is_empty() {
                findings
                    .entry(active.set.id().clone())
                    .or_insert_with(Vec::new)
                    .extend(report.findings);
            }
            suppressed.extend(report.suppressed);
            notifications.extend(report.notifications);
        }

        for listener in self.extensions.file_process_listeners() {
            listener.on_process_complete(file, &findings);
        }
        FileOutcome {
            findings,
            suppressed,
            notifications,
        }
    }
}
