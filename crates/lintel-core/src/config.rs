//! Layered configuration nodes.
//!
//! A [`Config`] is an immutable, cheaply clonable view onto a map-of-maps
//! document. Nodes are scoped structurally with [`Config::sub_config`] and can
//! be layered with [`Config::composite`] so that user settings override the
//! built-in defaults key by key, at every nesting level.
//!
//! ```text
//! [style]              <- rule set scope   (config.sub_config("style"))
//! active = true
//!
//! [style.MaxLineLength] <- rule scope      (style.sub_config("MaxLineLength"))
//! maxLineLength = 100
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key toggling a rule set or rule.
pub const ACTIVE_KEY: &str = "active";
/// Key toggling auto-correction.
pub const AUTO_CORRECT_KEY: &str = "autoCorrect";
/// Key overriding the severity of a rule or rule set.
pub const SEVERITY_KEY: &str = "severity";
/// Key listing additional suppression aliases of a rule.
pub const ALIASES_KEY: &str = "aliases";
/// Key listing glob patterns of files to skip.
pub const EXCLUDES_KEY: &str = "excludes";
/// Key listing glob patterns of files to analyze exclusively.
pub const INCLUDES_KEY: &str = "includes";
/// Key listing annotation names whose presence suppresses findings.
pub const IGNORE_ANNOTATED_KEY: &str = "ignoreAnnotated";
/// Rule set key selecting a code style variant for variant-aware defaults.
pub const CODE_STYLE_KEY: &str = "code_style";
/// Top-level section holding tool settings.
pub const CONFIG_SECTION: &str = "config";
/// Key inside [`CONFIG_SECTION`] promoting validation warnings to errors.
pub const WARNINGS_AS_ERRORS_KEY: &str = "warningsAsErrors";

/// Separator used when printing nested key paths (`style>MaxLineLength>active`).
pub const KEY_SEPARATOR: &str = ">";

/// Ordered map backing a config scope.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A string scalar.
    String(String),
    /// An integer scalar.
    Integer(i64),
    /// A floating point scalar.
    Float(f64),
    /// A boolean scalar.
    Bool(bool),
    /// A list of values.
    List(Vec<ConfigValue>),
    /// A nested scope.
    Map(ConfigMap),
}

impl ConfigValue {
    /// Returns a short name of the value's shape, used in error messages.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Returns the nested scope if this value is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the string if this value is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<toml::Value> for ConfigValue {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Self::String(s),
            toml::Value::Integer(i) => Self::Integer(i),
            toml::Value::Float(f) => Self::Float(f),
            toml::Value::Boolean(b) => Self::Bool(b),
            toml::Value::Datetime(d) => Self::String(d.to_string()),
            toml::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            toml::Value::Table(table) => Self::Map(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(value: Vec<ConfigValue>) -> Self {
        Self::List(value)
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(value: ConfigMap) -> Self {
        Self::Map(value)
    }
}

/// Conversion from a raw [`ConfigValue`] into a typed property value.
///
/// Returning `None` means the stored value has the wrong shape, which
/// [`Config::value_or_none`] reports as [`ConfigError::InvalidShape`].
pub trait FromConfigValue: Sized {
    /// Human readable description of the accepted shape.
    const EXPECTED: &'static str;

    /// Converts the raw value, or returns `None` on a shape mismatch.
    fn from_config_value(value: &ConfigValue) -> Option<Self>;
}

impl FromConfigValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromConfigValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromConfigValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromConfigValue for i32 {
    const EXPECTED: &'static str = "an integer";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        i64::from_config_value(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromConfigValue for usize {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        i64::from_config_value(value).and_then(|i| usize::try_from(i).ok())
    }
}

impl FromConfigValue for f64 {
    const EXPECTED: &'static str = "a number";

    #[allow(clippy::cast_precision_loss)]
    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Lists of strings also accept a comma-separated string, the legacy form.
impl FromConfigValue for Vec<String> {
    const EXPECTED: &'static str = "a list of strings";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            ConfigValue::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl FromConfigValue for ConfigValue {
    const EXPECTED: &'static str = "any value";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        Some(value.clone())
    }
}

/// Configuration errors.
///
/// Cloneable so memoized properties can hand the same error to every caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: Arc<std::io::Error>,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A stored value has a shape the caller cannot use.
    #[error("Invalid value for '{key}': expected {expected}, found {found}")]
    InvalidShape {
        /// Full key path of the offending property.
        key: String,
        /// Description of the accepted shape.
        expected: &'static str,
        /// Shape actually found.
        found: &'static str,
    },

    /// A value has the right shape but cannot be used (bad pattern, ...).
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue {
        /// Full key path of the offending property.
        key: String,
        /// What is wrong with the value.
        message: String,
    },

    /// A severity string that does not name a [`crate::Severity`].
    #[error("Unknown severity '{value}' for '{key}'. Allowed values: {allowed}")]
    UnknownSeverity {
        /// Full key path of the offending property.
        key: String,
        /// The configured string.
        value: String,
        /// The accepted values.
        allowed: &'static str,
    },

    /// A property needs the enclosing rule set scope but the config has none.
    #[error("Property '{key}' requires a rule set config as parent")]
    MissingParent {
        /// Full key path of the property.
        key: String,
    },
}

/// An immutable, layered configuration node.
///
/// Cloning is cheap; all clones share the same underlying document.
#[derive(Clone)]
pub struct Config {
    inner: Arc<Node>,
}

struct Node {
    layer: Layer,
    path: Vec<String>,
    parent: Option<Config>,
}

enum Layer {
    Empty,
    Map(Arc<ConfigMap>),
    Composite { primary: Config, fallback: Config },
    ActivateAll { user: Config, defaults: Config },
    NoAutoCorrect { base: Config },
}

impl Config {
    fn from_parts(layer: Layer, path: Vec<String>, parent: Option<Config>) -> Self {
        Self {
            inner: Arc::new(Node {
                layer,
                path,
                parent,
            }),
        }
    }

    /// Creates a node without any keys.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_parts(Layer::Empty, Vec::new(), None)
    }

    /// Creates a root node from an already parsed map-of-maps.
    #[must_use]
    pub fn from_map(map: ConfigMap) -> Self {
        Self::from_parts(Layer::Map(Arc::new(map)), Vec::new(), None)
    }

    /// Parses a TOML document into a root node.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Ok(Self::from_map(
            table
                .into_iter()
                .map(|(k, v)| (k, ConfigValue::from(v)))
                .collect(),
        ))
    }

    /// Loads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Layers `primary` over `fallback`: lookups try `primary` first.
    ///
    /// Sub-scopes compose recursively, so overriding one nested property keeps
    /// the fallback values of its siblings.
    #[must_use]
    pub fn composite(primary: Config, fallback: Config) -> Self {
        let path = primary.inner.path.clone();
        Self::from_parts(Layer::Composite { primary, fallback }, path, None)
    }

    /// Layers `user` over `defaults` and reports every scope as active unless
    /// `user` explicitly sets `active = false`.
    #[must_use]
    pub fn activate_all(user: Config, defaults: Config) -> Self {
        let path = user.inner.path.clone();
        Self::from_parts(Layer::ActivateAll { user, defaults }, path, None)
    }

    /// Wraps `base` so that `autoCorrect` reads as `false` in every scope.
    #[must_use]
    pub fn without_auto_correct(base: Config) -> Self {
        let path = base.inner.path.clone();
        Self::from_parts(Layer::NoAutoCorrect { base }, path, None)
    }

    /// Returns the nested scope stored under `key`.
    ///
    /// Never fails: an absent key, or a key holding a scalar, yields an
    /// empty node. The returned node remembers `self` as its parent.
    #[must_use]
    pub fn sub_config(&self, key: &str) -> Config {
        let layer = match &self.inner.layer {
            Layer::Empty => Layer::Empty,
            Layer::Map(map) => match map.get(key) {
                Some(ConfigValue::Map(sub)) => Layer::Map(Arc::new(sub.clone())),
                _ => Layer::Empty,
            },
            Layer::Composite { primary, fallback } => Layer::Composite {
                primary: primary.sub_config(key),
                fallback: fallback.sub_config(key),
            },
            Layer::ActivateAll { user, defaults } => Layer::ActivateAll {
                user: user.sub_config(key),
                defaults: defaults.sub_config(key),
            },
            Layer::NoAutoCorrect { base } => Layer::NoAutoCorrect {
                base: base.sub_config(key),
            },
        };
        let mut path = self.inner.path.clone();
        path.push(key.to_string());
        Self::from_parts(layer, path, Some(self.clone()))
    }

    /// Returns the raw value stored under `key`, resolving layers.
    #[must_use]
    pub fn raw_value(&self, key: &str) -> Option<ConfigValue> {
        match &self.inner.layer {
            Layer::Empty => None,
            Layer::Map(map) => map.get(key).cloned(),
            Layer::Composite { primary, fallback } => primary
                .raw_value(key)
                .or_else(|| fallback.raw_value(key)),
            Layer::ActivateAll { user, defaults } => {
                if key == ACTIVE_KEY {
                    let disabled = matches!(user.raw_value(key), Some(ConfigValue::Bool(false)));
                    Some(ConfigValue::Bool(!disabled))
                } else {
                    user.raw_value(key).or_else(|| defaults.raw_value(key))
                }
            }
            Layer::NoAutoCorrect { base } => {
                if key == AUTO_CORRECT_KEY {
                    Some(ConfigValue::Bool(false))
                } else {
                    base.raw_value(key)
                }
            }
        }
    }

    /// Returns the typed value under `key`, or `None` if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShape`] naming the key if the stored
    /// value cannot be converted to `T`.
    pub fn value_or_none<T: FromConfigValue>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.raw_value(key) {
            None => Ok(None),
            Some(value) => T::from_config_value(&value).map(Some).ok_or_else(|| {
                ConfigError::InvalidShape {
                    key: self.key_path(key),
                    expected: T::EXPECTED,
                    found: value.shape(),
                }
            }),
        }
    }

    /// Returns the typed value under `key`, or `default` if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShape`] naming the key if the stored
    /// value cannot be converted to `T`.
    pub fn value_or_default<T: FromConfigValue>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.value_or_none(key)?.unwrap_or(default))
    }

    /// Returns true if `key` holds any value in any layer.
    #[must_use]
    pub fn is_configured(&self, key: &str) -> bool {
        self.raw_value(key).is_some()
    }

    /// Returns the enclosing scope, if this node was created by [`Config::sub_config`].
    #[must_use]
    pub fn parent(&self) -> Option<&Config> {
        self.inner.parent.as_ref()
    }

    /// Returns the name of this scope (its last key), or `None` for a root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.path.last().map(String::as_str)
    }

    /// Returns the printable path of this scope, e.g. `style>MaxLineLength`.
    #[must_use]
    pub fn path(&self) -> String {
        self.inner.path.join(KEY_SEPARATOR)
    }

    /// Returns the printable path of `key` inside this scope.
    #[must_use]
    pub fn key_path(&self, key: &str) -> String {
        if self.inner.path.is_empty() {
            key.to_string()
        } else {
            format!("{}{KEY_SEPARATOR}{key}", self.path())
        }
    }

    /// Returns the backing map of a plain (non-layered) node.
    #[must_use]
    pub fn as_map(&self) -> Option<&ConfigMap> {
        match &self.inner.layer {
            Layer::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns true if no layer holds any key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.inner.layer {
            Layer::Empty => true,
            Layer::Map(map) => map.is_empty(),
            Layer::Composite { primary, fallback } => primary.is_empty() && fallback.is_empty(),
            Layer::ActivateAll { user, defaults } => user.is_empty() && defaults.is_empty(),
            Layer::NoAutoCorrect { base } => base.is_empty(),
        }
    }

    /// Collects the user-supplied maps of this node for validation.
    ///
    /// Defaults layered in by [`Config::activate_all`] are not user input and
    /// are skipped.
    pub(crate) fn user_maps(&self) -> Vec<&ConfigMap> {
        match &self.inner.layer {
            Layer::Empty => Vec::new(),
            Layer::Map(map) => vec![map.as_ref()],
            Layer::Composite { primary, fallback } => {
                let mut maps = primary.user_maps();
                maps.extend(fallback.user_maps());
                maps
            }
            Layer::ActivateAll { user, .. } => user.user_maps(),
            Layer::NoAutoCorrect { base } => base.user_maps(),
        }
    }

    fn layer_name(&self) -> &'static str {
        match &self.inner.layer {
            Layer::Empty => "empty",
            Layer::Map(_) => "map",
            Layer::Composite { .. } => "composite",
            Layer::ActivateAll { .. } => "activate-all",
            Layer::NoAutoCorrect { .. } => "no-auto-correct",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("path", &self.path())
            .field("layer", &self.layer_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> Config {
        Config::from_toml_str(toml).expect("test config should parse")
    }

    #[test]
    fn missing_key_yields_default() {
        let config = config("[style]\nactive = true");
        let style = config.sub_config("style");
        assert_eq!(style.value_or_default("threshold", 5_i64).unwrap(), 5);
        assert!(style.value_or_default(ACTIVE_KEY, false).unwrap());
    }

    #[test]
    fn lookups_are_case_sensitive() {
        let config = config("Threshold = 3");
        assert_eq!(config.value_or_none::<i64>("threshold").unwrap(), None);
        assert_eq!(config.value_or_none::<i64>("Threshold").unwrap(), Some(3));
    }

    #[test]
    fn wrong_shape_names_full_key_path() {
        let config = config("[style.MyRule]\nthreshold = \"five\"");
        let rule = config.sub_config("style").sub_config("MyRule");
        let err = rule.value_or_default("threshold", 5_i64).unwrap_err();
        match err {
            ConfigError::InvalidShape { key, found, .. } => {
                assert_eq!(key, "style>MyRule>threshold");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn absent_sub_config_is_empty_and_remembers_parent() {
        let config = config("[style]\nactive = true");
        let missing = config.sub_config("style").sub_config("Nope");
        assert!(missing.is_empty());
        assert_eq!(missing.path(), "style>Nope");
        assert_eq!(missing.parent().and_then(Config::name), Some("style"));
    }

    #[test]
    fn scalar_is_not_a_scope() {
        let config = config("style = 3");
        assert!(config.sub_config("style").is_empty());
    }

    #[test]
    fn siblings_do_not_inherit() {
        let config = config("[a]\nx = 1\n[b]\ny = 2");
        assert_eq!(config.sub_config("b").value_or_none::<i64>("x").unwrap(), None);
    }

    #[test]
    fn comma_separated_string_is_accepted_as_list() {
        let config = config("excludes = \"a/**, b/** ,\"");
        let list: Vec<String> = config.value_or_default(EXCLUDES_KEY, Vec::new()).unwrap();
        assert_eq!(list, vec!["a/**".to_string(), "b/**".to_string()]);
    }

    #[test]
    fn list_with_non_strings_is_rejected() {
        let config = config("excludes = [1, 2]");
        assert!(config
            .value_or_default::<Vec<String>>(EXCLUDES_KEY, Vec::new())
            .is_err());
    }

    #[test]
    fn composite_prefers_primary_and_falls_back_per_key() {
        let user = config("[style.MyRule]\nthreshold = 10");
        let defaults = config("[style.MyRule]\nthreshold = 5\nactive = true");
        let composite = Config::composite(user, defaults);
        let rule = composite.sub_config("style").sub_config("MyRule");
        assert_eq!(rule.value_or_default("threshold", 0_i64).unwrap(), 10);
        assert!(rule.value_or_default(ACTIVE_KEY, false).unwrap());
    }

    #[test]
    fn composite_keeps_present_empty_list_from_primary() {
        let user = config("[style]\nexcludes = []");
        let defaults = config("[style]\nexcludes = [\"**/test/**\"]");
        let style = Config::composite(user, defaults).sub_config("style");
        let excludes: Vec<String> = style.value_or_default(EXCLUDES_KEY, Vec::new()).unwrap();
        assert!(excludes.is_empty());
    }

    #[test]
    fn activate_all_turns_rules_on_unless_disabled_by_user() {
        let user = config("[style.Off]\nactive = false");
        let defaults = config("[style.Sleeping]\nactive = false\nthreshold = 3");
        let all = Config::activate_all(user, defaults);
        let style = all.sub_config("style");
        assert!(style.sub_config("Sleeping").value_or_default(ACTIVE_KEY, false).unwrap());
        assert!(!style.sub_config("Off").value_or_default(ACTIVE_KEY, true).unwrap());
        assert_eq!(
            style.sub_config("Sleeping").value_or_default("threshold", 0_i64).unwrap(),
            3
        );
    }

    #[test]
    fn without_auto_correct_forces_false() {
        let base = config("[style]\nautoCorrect = true\n[style.Rule]\nautoCorrect = true");
        let wrapped = Config::without_auto_correct(base);
        let style = wrapped.sub_config("style");
        assert!(!style.value_or_default(AUTO_CORRECT_KEY, true).unwrap());
        assert!(!style.sub_config("Rule").value_or_default(AUTO_CORRECT_KEY, true).unwrap());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        assert!(matches!(
            Config::from_toml_str("[style"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
