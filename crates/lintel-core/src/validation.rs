//! Typo detection: compares user configuration against the defaults document.

use crate::config::{
    Config, ConfigError, ConfigMap, ConfigValue, CONFIG_SECTION, WARNINGS_AS_ERRORS_KEY,
};
use crate::types::Notification;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// Property paths never reported, as anchored regular expressions over
/// `>`-joined key paths.
pub const DEFAULT_PROPERTY_EXCLUDES: &[&str] = &[
    ".*>excludes",
    ".*>includes",
    ".*>active",
    ".*>.*>autoCorrect",
    ".*>severity",
    ".*>.*>severity",
    ".*>.*>aliases",
    ".*>.*>ignoreAnnotated",
    ".*>code_style",
    "config>.*",
];

/// Key inside [`CONFIG_SECTION`] turning validation off.
pub const VALIDATION_KEY: &str = "validation";

/// Key inside [`CONFIG_SECTION`] listing additional excluded property patterns.
pub const VALIDATION_EXCLUDES_KEY: &str = "excludes";

/// Knobs of [`validate_config`].
#[derive(Debug, Clone, Default)]
pub struct ValidationSettings {
    /// Report array-shape problems as errors.
    pub warnings_as_errors: bool,
    /// Extra excluded property path patterns.
    pub excludes: Vec<String>,
    /// Deprecated property paths with their migration hint.
    pub deprecations: BTreeMap<String, String>,
}

impl ValidationSettings {
    /// Reads `config>warningsAsErrors` and `config>excludes` from a user config.
    ///
    /// # Errors
    ///
    /// Returns an error naming the key if either setting has the wrong shape.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let section = config.sub_config(CONFIG_SECTION);
        Ok(Self {
            warnings_as_errors: section.value_or_default(WARNINGS_AS_ERRORS_KEY, false)?,
            excludes: section.value_or_default(VALIDATION_EXCLUDES_KEY, Vec::new())?,
            deprecations: BTreeMap::new(),
        })
    }

    /// Adds a deprecated property path.
    #[must_use]
    pub fn deprecate(mut self, path: impl Into<String>, hint: impl Into<String>) -> Self {
        self.deprecations.insert(path.into(), hint.into());
        self
    }
}

/// Checks every key of `config` against `baseline` and reports unknown keys,
/// shape mismatches and deprecated properties.
///
/// Never fails: problems are returned as notifications. Layered configs are
/// validated on every user-supplied side. Nothing is reported when
/// `config>validation` is false or the baseline is not a plain document.
#[must_use]
pub fn validate_config(
    config: &Config,
    baseline: &Config,
    settings: &ValidationSettings,
) -> Vec<Notification> {
    if !config
        .sub_config(CONFIG_SECTION)
        .value_or_default(VALIDATION_KEY, true)
        .unwrap_or(true)
    {
        debug!("Config validation disabled");
        return Vec::new();
    }
    let Some(base) = baseline.as_map() else {
        debug!("Validation baseline is not a plain document, skipping");
        return Vec::new();
    };

    let mut notifications = Vec::new();
    let mut excludes: Vec<Regex> = DEFAULT_PROPERTY_EXCLUDES
        .iter()
        .filter_map(|pattern| anchored(pattern).ok())
        .collect();
    for pattern in &settings.excludes {
        match anchored(pattern) {
            Ok(regex) => excludes.push(regex),
            Err(e) => notifications.push(Notification::warning(format!(
                "Invalid validation exclude pattern '{pattern}': {e}"
            ))),
        }
    }

    let validator = Validator {
        excludes,
        settings,
    };
    for map in config.user_maps() {
        if std::ptr::eq(map, base) {
            continue;
        }
        validator.test_keys(map, base, None, &mut notifications);
    }
    notifications
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

struct Validator<'a> {
    excludes: Vec<Regex>,
    settings: &'a ValidationSettings,
}

impl Validator<'_> {
    fn test_keys(
        &self,
        current: &ConfigMap,
        base: &ConfigMap,
        parent: Option<&str>,
        notifications: &mut Vec<Notification>,
    ) {
        for (key, value) in current {
            let path = match parent {
                Some(parent) => format!("{parent}>{key}"),
                None => key.clone(),
            };

            if let Some(hint) = self.settings.deprecations.get(&path) {
                notifications.push(Notification::warning(format!(
                    "Property '{path}' is deprecated. {hint}."
                )));
                continue;
            }
            if self.excludes.iter().any(|regex| regex.is_match(&path)) {
                continue;
            }

            let Some(base_value) = base.get(key) else {
                notifications.push(Notification::error(format!(
                    "Property '{path}' is misspelled or does not exist."
                )));
                continue;
            };

            match (value, base_value) {
                (ConfigValue::String(_), ConfigValue::List(_)) => {
                    let message = format!(
                        "Property '{path}' should be an array instead of a comma-separated string."
                    );
                    notifications.push(if self.settings.warnings_as_errors {
                        Notification::error(message)
                    } else {
                        Notification::warning(message)
                    });
                }
                (ConfigValue::Map(next), ConfigValue::Map(next_base)) => {
                    self.test_keys(next, next_base, Some(&path), notifications);
                }
                (_, ConfigValue::Map(_)) => notifications.push(Notification::error(format!(
                    "Nested config expected for '{path}'."
                ))),
                (ConfigValue::Map(_), _) => notifications.push(Notification::error(format!(
                    "Unexpected nested config for '{path}'."
                ))),
                _ => {}
            }
        }
    }
}
