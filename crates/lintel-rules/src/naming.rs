//! Naming conventions for functions and types.
//!
//! Both rules run as one [`MultiRule`] so a file is traversed once for the
//! whole convention check.
//!
//! # Configuration
//!
//! `FunctionNaming`:
//! - `functionPattern`: Regex a function name must match (default:
//!   `[a-z_][a-z0-9_]*`). The former key `pattern` is still read when
//!   `functionPattern` is not configured.
//! - `ignoreOverridden`: Skip functions in trait impls (default: true)
//!
//! `TypeNaming`:
//! - `typePattern`: Regex a struct, enum, union or trait name must match
//!   (default: `[A-Z][A-Za-z0-9]*`)

use lintel_core::{
    Config, ConfigAware, ConfigError, Debt, IdError, Issue, MultiRule, Node, NodeKind, Property,
    Rule, RuleBox, RuleContext, RuleError, Severity,
};
use regex::Regex;

/// Rule id for function-naming.
pub const FUNCTION_NAMING: &str = "FunctionNaming";

/// Rule id for type-naming.
pub const TYPE_NAMING: &str = "TypeNaming";

/// Builds the naming multi rule from the `naming` rule set scope.
///
/// # Errors
///
/// Returns an error if a pattern is not a valid regular expression or a
/// property has the wrong shape.
pub fn naming_rules(rule_set: &Config) -> Result<MultiRule, NamingError> {
    let rules: Vec<RuleBox> = vec![
        Box::new(FunctionNaming::new(rule_set.sub_config(FUNCTION_NAMING))?),
        Box::new(TypeNaming::new(rule_set.sub_config(TYPE_NAMING))?),
    ];
    Ok(MultiRule::new(rules)?)
}

/// Errors raised while building the naming rules.
#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    /// A rule id is invalid.
    #[error(transparent)]
    Id(#[from] IdError),

    /// A property is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn anchored(pattern: String) -> Result<Regex, String> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| e.to_string())
}

/// Reports functions whose name does not match `functionPattern`.
#[derive(Debug)]
pub struct FunctionNaming {
    issue: Issue,
    config: Config,
    pattern: Property<Regex>,
    ignore_overridden: Property<bool>,
}

impl FunctionNaming {
    /// Creates the rule reading its properties from `config`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in id.
    pub fn new(config: Config) -> Result<Self, IdError> {
        Ok(Self {
            issue: Issue::new(
                FUNCTION_NAMING,
                Severity::Warning,
                "Function names should follow the naming convention set in the configuration",
                Debt::FIVE_MINS,
            )?,
            pattern: Property::with_fallback(
                &config,
                "functionPattern",
                "pattern",
                "[a-z_][a-z0-9_]*".to_string(),
                anchored,
            ),
            ignore_overridden: Property::new(&config, "ignoreOverridden", true),
            config,
        })
    }
}

impl ConfigAware for FunctionNaming {
    fn issue(&self) -> &Issue {
        &self.issue
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for FunctionNaming {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::Function]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let Some(name) = node.name() else {
            return Ok(());
        };
        if *self.ignore_overridden.get()? && in_trait_impl(node) {
            return Ok(());
        }
        let pattern = self.pattern.get()?;
        if !pattern.is_match(name) {
            ctx.report(
                node,
                format!(
                    "Function names should match the pattern: {}",
                    display_pattern(pattern)
                ),
            );
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.pattern.get()?;
        self.ignore_overridden.get()?;
        Ok(())
    }
}

fn in_trait_impl(node: Node<'_>) -> bool {
    node.parent().is_some_and(|owner| {
        let signature = owner.signature();
        signature.starts_with("impl ") && signature.contains(" for ")
    })
}

/// Reports types whose name does not match `typePattern`.
#[derive(Debug)]
pub struct TypeNaming {
    issue: Issue,
    config: Config,
    pattern: Property<Regex>,
}

impl TypeNaming {
    /// Creates the rule reading its properties from `config`.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in id.
    pub fn new(config: Config) -> Result<Self, IdError> {
        Ok(Self {
            issue: Issue::new(
                TYPE_NAMING,
                Severity::Warning,
                "A type's name should follow the naming convention set in the configuration",
                Debt::FIVE_MINS,
            )?,
            pattern: Property::with_try_transform(
                &config,
                "typePattern",
                "[A-Z][A-Za-z0-9]*".to_string(),
                anchored,
            ),
            config,
        })
    }
}

impl ConfigAware for TypeNaming {
    fn issue(&self) -> &Issue {
        &self.issue
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

impl Rule for TypeNaming {
    fn node_kinds(&self) -> &[NodeKind] {
        &[NodeKind::Class]
    }

    fn visit(&self, node: Node<'_>, ctx: &mut RuleContext<'_>) -> Result<(), RuleError> {
        // impl blocks are named after their self type
        if node.signature().starts_with("impl ") {
            return Ok(());
        }
        let Some(name) = node.name() else {
            return Ok(());
        };
        let pattern = self.pattern.get()?;
        if !pattern.is_match(name) {
            ctx.report(
                node,
                format!(
                    "Type names should match the pattern: {}",
                    display_pattern(pattern)
                ),
            );
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.pattern.get().map(|_| ())
    }
}

/// The configured pattern without the anchoring added by [`anchored`].
fn display_pattern(regex: &Regex) -> &str {
    regex
        .as_str()
        .strip_prefix("^(?:")
        .and_then(|p| p.strip_suffix(")$"))
        .unwrap_or(regex.as_str())
}
