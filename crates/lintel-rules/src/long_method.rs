//! Rule to limit the length of functions.
//!
//! # Rationale
//!
//! Long functions tend to mix several concerns and are hard to read and
//! review. Extracting well-named helpers keeps each step understandable.
//!
//! # Configuration
//!
//! - `threshold`: Number of lines that triggers a finding (default: 60)

use crate::long_parameter_list::to_i64;
use lintel_core::{
    Config, ConfigAware, ConfigError, Debt, IdError, Issue, Metric, Node, NodeKind, Property,
    Rule, RuleContext, RuleError, Severity,
};

/// Rule id for long-method.
pub const ID: &str = "LongMethod";

/// Reports functions spanning at least `threshold` lines, signature included.
#[derive(Debug)]
pub struct LongMethod {
    issue: Issue,
    config: Config,
    threshold: Property<usize>,
}

impl LongMethod {
    /// Creates the rule reading its properties from `config`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in id.
    pub fn new(config: Config) -> Result<Self, IdError> {
        Ok(Self {
            issue: Issue::new(
                ID,
                Severity::Warning,
                "One function should have one responsibility. Long functions tend to do too many things",
                Debt::TWENTY_MINS,
            )?,
            threshold: Property::new(&config, "threshold", 60),
            config,
        })
    }
}

impl ConfigAware for LongMethod {
    fn issue(&self) -> &Issue {
        &self.issue
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for LongMethod {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::Function]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let threshold = *self.threshold.get()?;
        let lines = node.line_count();
        if lines >= threshold {
            let name = node.name().unwrap_or("<anonymous>");
            ctx.report_metric(
                node,
                format!("The function {name} is too long ({lines}). The maximum length is {threshold}."),
                Metric::new("SIZE", to_i64(lines), to_i64(threshold)),
            );
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.threshold.get().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run;
    use lintel_core::RuleEntry;

    const CODE: &str = "fn short() {}\n\nfn long() {\n    let a = 1;\n    let b = 2;\n    let _ = a + b;\n}\n";

    fn check(toml: &str) -> Vec<String> {
        run("complexity", toml, CODE, |config| {
            vec![RuleEntry::single(LongMethod::new(config.sub_config(ID)).unwrap())]
        })
        .findings
        .into_iter()
        .map(|f| f.message)
        .collect()
    }

    #[test]
    fn counts_lines_from_signature_to_closing_brace() {
        assert_eq!(
            check("[complexity.LongMethod]\nthreshold = 5"),
            vec!["The function long is too long (5). The maximum length is 5."]
        );
        assert!(check("[complexity.LongMethod]\nthreshold = 6").is_empty());
    }

    #[test]
    fn suppressed_by_attribute() {
        let code = "#[suppress(\"complexity.LongMethod\")]\nfn long() {\n    let a = 1;\n}\n";
        let report = run("complexity", "[complexity.LongMethod]\nthreshold = 2", code, |config| {
            vec![RuleEntry::single(LongMethod::new(config.sub_config(ID)).unwrap())]
        });
        assert!(report.findings.is_empty());
    }
}
