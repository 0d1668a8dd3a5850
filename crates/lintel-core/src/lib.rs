//! # lintel-core
//!
//! Rule orchestration engine for syntax-tree based linting.
//!
//! This crate provides the foundational traits and types for building
//! linters on top of a parsed [`SyntaxTree`]. It includes:
//!
//! - [`Config`] layered, path-aware configuration documents
//! - [`Property`] lazily resolved, once-only rule settings
//! - [`Rule`] and [`ConfigAware`] for per-file rules
//! - [`RuleSet`], [`MultiRule`] and [`RuleSetProvider`] for grouping rules
//! - [`Extension`] and friends for reports, listeners and result transforms
//! - [`Analyzer`] for orchestrating lint execution
//!
//! ## Example
//!
//! ```ignore
//! use lintel_core::{Analyzer, Config};
//!
//! let analyzer = Analyzer::builder()
//!     .provider(StyleProvider)
//!     .config(Config::from_file(path)?)
//!     .defaults(Config::from_toml_str(DEFAULTS)?)
//!     .build()?;
//!
//! let result = analyzer.analyze(&trees);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod config;
mod context;
mod extension;
mod filters;
mod ids;
mod issue;
mod metrics;
mod property;
mod report;
mod rule;
mod rule_set;
mod suppression;
mod tree;
mod types;
mod validation;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError};
pub use config::{
    Config, ConfigError, ConfigMap, ConfigValue, FromConfigValue, ACTIVE_KEY, ALIASES_KEY,
    AUTO_CORRECT_KEY, CODE_STYLE_KEY, CONFIG_SECTION, EXCLUDES_KEY, IGNORE_ANNOTATED_KEY,
    INCLUDES_KEY, KEY_SEPARATOR, SEVERITY_KEY, WARNINGS_AS_ERRORS_KEY,
};
pub use context::AnalysisContext;
pub use extension::{
    ConsoleReport, Extension, ExtensionRegistry, Extensions, FileProcessListener, OutputReport,
    ReportingExtension,
};
pub use filters::PathFilters;
pub use ids::{IdError, RuleId, RuleSetId};
pub use issue::{Debt, Issue, Metric, MetricError, ParseSeverityError, Severity, ZeroDebtError};
pub use metrics::{ProjectStatistics, FILES_METRIC, FINDINGS_METRIC, LINES_METRIC};
pub use property::{Property, ValueWithReason, ValuesWithReason};
pub use report::{ReportError, ReportWriter};
pub use rule::{ConfigAware, Rule, RuleBox, RuleContext, RuleError, RuleSetReport};
pub use rule_set::{MultiRule, RuleEntry, RuleSet, RuleSetError, RuleSetProvider};
pub use suppression::{
    is_annotated_with, is_suppressed, SuppressReason, SuppressionTarget, SUPPRESSION_ANNOTATIONS,
    TOOL_PREFIXES,
};
pub use tree::{Ancestors, Annotation, Node, NodeId, NodeKind, NodeSpec, Span, SyntaxTree, TreeBuilder};
pub use types::{
    Entity, Finding, FindingDiagnostic, FindingsMap, LintResult, Location, Notification,
    NotificationLevel, ProjectMetric,
};
pub use validation::{
    validate_config, ValidationSettings, DEFAULT_PROPERTY_EXCLUDES, VALIDATION_EXCLUDES_KEY,
    VALIDATION_KEY,
};
