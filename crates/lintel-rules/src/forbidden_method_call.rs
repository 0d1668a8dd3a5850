//! Rule to forbid calls to configured functions, methods and macros.
//!
//! # Configuration
//!
//! - `methods`: Values with an optional reason. A value containing `::` is
//!   compared against the full call path (`std::process::exit`), any other
//!   value against the called name (`unwrap`, `dbg!`).
//!
//! ```toml
//! [style.ForbiddenMethodCall]
//! active = true
//! methods = [
//!     "std::process::exit",
//!     { value = "dbg!", reason = "Debug output must not be committed" },
//! ]
//! ```

use lintel_core::{
    Config, ConfigAware, ConfigError, Debt, IdError, Issue, Node, NodeKind, Property, Rule,
    RuleContext, RuleError, Severity, ValueWithReason, ValuesWithReason,
};

/// Rule id for forbidden-method-call.
pub const ID: &str = "ForbiddenMethodCall";

/// Reports calls listed in `methods`.
#[derive(Debug)]
pub struct ForbiddenMethodCall {
    issue: Issue,
    config: Config,
    methods: Property<ValuesWithReason>,
}

impl ForbiddenMethodCall {
    /// Creates the rule reading its properties from `config`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in id.
    pub fn new(config: Config) -> Result<Self, IdError> {
        let defaults = ValuesWithReason(vec![
            ValueWithReason {
                value: "dbg!".to_string(),
                reason: Some("Debug output must not be committed".to_string()),
            },
            ValueWithReason {
                value: "std::process::exit".to_string(),
                reason: None,
            },
        ]);
        Ok(Self {
            issue: Issue::new(
                ID,
                Severity::Warning,
                "Mark forbidden methods. A forbidden method could be an invocation of an unstable API",
                Debt::TEN_MINS,
            )?,
            methods: Property::new(&config, "methods", defaults),
            config,
        })
    }
}

impl ConfigAware for ForbiddenMethodCall {
    fn issue(&self) -> &Issue {
        &self.issue
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for ForbiddenMethodCall {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::Call]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let Some(name) = node.name() else {
            return Ok(());
        };
        let path = node.signature();
        let forbidden = self.methods.get()?.iter().find(|entry| {
            if entry.value.contains("::") {
                entry.value == path
            } else {
                entry.value == name
            }
        });

        if let Some(entry) = forbidden {
            let message = match &entry.reason {
                Some(reason) => format!(
                    "The method `{}` has been forbidden: {reason}",
                    entry.value
                ),
                None => format!(
                    "The method `{}` has been forbidden in the lintel config.",
                    entry.value
                ),
            };
            ctx.report(node, message);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.methods.get().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run;
    use lintel_core::RuleEntry;

    const CODE: &str = r#"fn main() {
    let v: Option<u8> = None;
    dbg!(v);
    v.unwrap();
    std::process::exit(1);
}
"#;

    fn messages(toml: &str) -> Vec<String> {
        run("style", toml, CODE, |config| {
            vec![RuleEntry::single(ForbiddenMethodCall::new(config.sub_config(ID)).unwrap())]
        })
        .findings
        .into_iter()
        .map(|f| format!("{}: {}", f.location().line, f.message))
        .collect()
    }

    #[test]
    fn default_list_forbids_dbg_and_exit() {
        assert_eq!(
            messages(""),
            vec![
                "3: The method `dbg!` has been forbidden: Debug output must not be committed",
                "5: The method `std::process::exit` has been forbidden in the lintel config.",
            ]
        );
    }

    #[test]
    fn configured_list_replaces_defaults() {
        let toml = r#"
[style.ForbiddenMethodCall]
methods = [{ value = "unwrap", reason = "Propagate the error instead" }]
"#;
        assert_eq!(
            messages(toml),
            vec!["4: The method `unwrap` has been forbidden: Propagate the error instead"]
        );
    }

    #[test]
    fn plain_strings_are_accepted() {
        let toml = "[style.ForbiddenMethodCall]\nmethods = [\"exit\"]";
        assert_eq!(
            messages(toml),
            vec!["5: The method `exit` has been forbidden in the lintel config."]
        );
    }
}
