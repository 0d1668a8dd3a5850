//! Rule set providers for the built-in rules.

use crate::forbidden_method_call::{self, ForbiddenMethodCall};
use crate::long_method::{self, LongMethod};
use crate::long_parameter_list::{self, LongParameterList};
use crate::max_line_length::{self, MaxLineLength};
use crate::naming::{naming_rules, NamingError};
use lintel_core::{
    Config, ConfigError, RuleEntry, RuleSet, RuleSetError, RuleSetId, RuleSetProvider,
};
use tracing::debug;

/// Rule set id of the complexity rules.
pub const COMPLEXITY: &str = "complexity";
/// Rule set id of the style rules.
pub const STYLE: &str = "style";
/// Rule set id of the naming rules.
pub const NAMING: &str = "naming";

/// The built-in defaults document.
pub const DEFAULT_CONFIG: &str = include_str!("default-config.toml");

/// Properties replaced by newer keys, with their migration hint.
pub const DEPRECATED_PROPERTIES: &[(&str, &str)] = &[(
    "naming>FunctionNaming>pattern",
    "Use 'functionPattern' instead",
)];

/// Parses [`DEFAULT_CONFIG`].
///
/// # Errors
///
/// Returns an error if the embedded document is not valid TOML.
pub fn default_config() -> Result<Config, ConfigError> {
    Config::from_toml_str(DEFAULT_CONFIG)
}

/// All built-in providers, in report order.
#[must_use]
pub fn providers() -> Vec<Box<dyn RuleSetProvider>> {
    vec![
        Box::new(ComplexityProvider),
        Box::new(StyleProvider),
        Box::new(NamingProvider),
    ]
}

/// Provides `LongParameterList` and `LongMethod`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityProvider;

impl RuleSetProvider for ComplexityProvider {
    fn rule_set_id(&self) -> &str {
        COMPLEXITY
    }

    fn instance(&self, config: &Config) -> Result<RuleSet, RuleSetError> {
        debug!(rule_set = COMPLEXITY, "Instantiating rule set");
        RuleSet::new(
            RuleSetId::new(COMPLEXITY)?,
            vec![
                RuleEntry::single(LongParameterList::new(
                    config.sub_config(long_parameter_list::ID),
                )?),
                RuleEntry::single(LongMethod::new(config.sub_config(long_method::ID))?),
            ],
        )
    }
}

/// Provides `MaxLineLength` and `ForbiddenMethodCall`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleProvider;

impl RuleSetProvider for StyleProvider {
    fn rule_set_id(&self) -> &str {
        STYLE
    }

    fn instance(&self, config: &Config) -> Result<RuleSet, RuleSetError> {
        debug!(rule_set = STYLE, "Instantiating rule set");
        RuleSet::new(
            RuleSetId::new(STYLE)?,
            vec![
                RuleEntry::single(MaxLineLength::new(config.sub_config(max_line_length::ID))?),
                RuleEntry::single(ForbiddenMethodCall::new(
                    config.sub_config(forbidden_method_call::ID),
                )?),
            ],
        )
    }
}

/// Provides the naming multi rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingProvider;

impl RuleSetProvider for NamingProvider {
    fn rule_set_id(&self) -> &str {
        NAMING
    }

    fn instance(&self, config: &Config) -> Result<RuleSet, RuleSetError> {
        debug!(rule_set = NAMING, "Instantiating rule set");
        let naming = naming_rules(config).map_err(|e| match e {
            NamingError::Id(e) => RuleSetError::Id(e),
            NamingError::Config(e) => RuleSetError::Config(e),
        })?;
        RuleSet::new(RuleSetId::new(NAMING)?, vec![naming.into()])
    }
}
