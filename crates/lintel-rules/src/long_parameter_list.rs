//! Rule to limit the number of function parameters.
//!
//! # Rationale
//!
//! Functions with many parameters are hard to call correctly and usually do
//! more than one thing. Grouping related parameters into a struct makes call
//! sites readable and the signature stable.
//!
//! # Configuration
//!
//! - `threshold`: Number of parameters that triggers a finding (default: 6)
//! - `ignoreSelf`: Do not count the `self` receiver (default: true)

use lintel_core::{
    Config, ConfigAware, ConfigError, Debt, IdError, Issue, Metric, Node, NodeKind, Property,
    Rule, RuleContext, RuleError, Severity,
};

/// Rule id for long-parameter-list.
pub const ID: &str = "LongParameterList";

/// Reports functions whose parameter count reaches `threshold`.
#[derive(Debug)]
pub struct LongParameterList {
    issue: Issue,
    config: Config,
    threshold: Property<usize>,
    ignore_self: Property<bool>,
}

impl LongParameterList {
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
                "Functions with many parameters are hard to call and to test",
                Debt::TWENTY_MINS,
            )?,
            threshold: Property::new(&config, "threshold", 6),
            ignore_self: Property::new(&config, "ignoreSelf", true),
            config,
        })
    }
}

impl ConfigAware for LongParameterList {
    fn issue(&self) -> &Issue {
        &self.issue
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for LongParameterList {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::Function]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let threshold = *self.threshold.get()?;
        let ignore_self = *self.ignore_self.get()?;
        let count = node
            .children()
            .filter(|c| c.kind() == NodeKind::Parameter)
            .filter(|c| !(ignore_self && c.name() == Some("self")))
            .count();

        if count >= threshold {
            let name = node.name().unwrap_or("<anonymous>");
            ctx.report_metric(
                node,
                format!(
                    "The function {name}({count}) has too many parameters. \
                     The current threshold is set to {threshold}."
                ),
                Metric::new("SIZE", to_i64(count), to_i64(threshold)),
            );
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.threshold.get()?;
        self.ignore_self.get()?;
        Ok(())
    }
}

pub(crate) fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
