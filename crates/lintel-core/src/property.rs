//! Lazily resolved, memoized rule properties.
//!
//! A [`Property`] captures the config scope it reads from at construction and
//! resolves its value on first access. The result (including an error) is
//! computed once and handed out on every later access.
//!
//! ```ignore
//! struct MaxLineLength {
//!     config: Config,
//!     max: Property<usize>,
//! }
//!
//! impl MaxLineLength {
//!     fn new(config: Config) -> Self {
//!         let max = Property::new(&config, "maxLineLength", 120_usize);
//!         Self { config, max }
//!     }
//! }
//! ```

use crate::config::{Config, ConfigError, ConfigValue, FromConfigValue, CODE_STYLE_KEY};
use std::fmt;
use std::sync::OnceLock;

type Resolver<T> = Box<dyn Fn() -> Result<T, ConfigError> + Send + Sync>;

/// A configurable value read from a rule's config scope.
pub struct Property<T> {
    key: String,
    resolver: Resolver<T>,
    value: OnceLock<Result<T, ConfigError>>,
}

impl<T> Property<T> {
    /// Returns the configuration key this property reads.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolves the value, running the resolver at most once.
    ///
    /// # Errors
    ///
    /// Returns the configuration error raised by the first resolution.
    pub fn get(&self) -> Result<&T, ConfigError> {
        self.value
            .get_or_init(|| (self.resolver)())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn from_resolver(key: &str, resolver: Resolver<T>) -> Self {
        Self {
            key: key.to_string(),
            resolver,
            value: OnceLock::new(),
        }
    }
}

impl<T: FromConfigValue + Clone + Send + Sync + 'static> Property<T> {
    /// Reads `key` from `config`, or `default` when it is absent.
    #[must_use]
    pub fn new(config: &Config, key: &str, default: T) -> Self {
        Self::with_transform(config, key, default, |value| value)
    }
}

impl<T: 'static> Property<T> {
    /// Reads `key` as `D` and maps it to `T`.
    #[must_use]
    pub fn with_transform<D, F>(config: &Config, key: &str, default: D, transform: F) -> Self
    where
        D: FromConfigValue + Clone + Send + Sync + 'static,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        Self::with_try_transform(config, key, default, move |value| Ok(transform(value)))
    }

    /// Reads `key` as `D` and maps it to `T` with a fallible transform.
    ///
    /// A transform error surfaces as [`ConfigError::InvalidValue`] naming `key`.
    #[must_use]
    pub fn with_try_transform<D, F>(config: &Config, key: &str, default: D, transform: F) -> Self
    where
        D: FromConfigValue + Clone + Send + Sync + 'static,
        F: Fn(D) -> Result<T, String> + Send + Sync + 'static,
    {
        let config = config.clone();
        let owned_key = key.to_string();
        Self::from_resolver(
            key,
            Box::new(move || {
                let raw = config.value_or_default(&owned_key, default.clone())?;
                apply(&config, &owned_key, raw, &transform)
            }),
        )
    }

    /// Reads `key`, then the deprecated `fallback_key`, then uses `default`.
    ///
    /// The own key wins whenever it is configured, even with an empty value.
    #[must_use]
    pub fn with_fallback<D, F>(
        config: &Config,
        key: &str,
        fallback_key: &str,
        default: D,
        transform: F,
    ) -> Self
    where
        D: FromConfigValue + Clone + Send + Sync + 'static,
        F: Fn(D) -> Result<T, String> + Send + Sync + 'static,
    {
        let config = config.clone();
        let owned_key = key.to_string();
        let fallback_key = fallback_key.to_string();
        Self::from_resolver(
            key,
            Box::new(move || {
                if let Some(own) = config.value_or_none::<D>(&owned_key)? {
                    return apply(&config, &owned_key, own, &transform);
                }
                if let Some(fallback) = config.value_or_none::<D>(&fallback_key)? {
                    return apply(&config, &fallback_key, fallback, &transform);
                }
                apply(&config, &owned_key, default.clone(), &transform)
            }),
        )
    }

    /// Reads `key`, defaulting to `variant_default` when the enclosing rule
    /// set selects `variant` through its `code_style` key, else to `default`.
    ///
    /// Resolution fails with [`ConfigError::MissingParent`] if `config` is not
    /// a rule scope nested in a rule set scope.
    #[must_use]
    pub fn with_variant<D, F>(
        config: &Config,
        key: &str,
        default: D,
        variant: &str,
        variant_default: D,
        transform: F,
    ) -> Self
    where
        D: FromConfigValue + Clone + Send + Sync + 'static,
        F: Fn(D) -> Result<T, String> + Send + Sync + 'static,
    {
        let config = config.clone();
        let owned_key = key.to_string();
        let variant = variant.to_string();
        Self::from_resolver(
            key,
            Box::new(move || {
                let rule_set = config.parent().ok_or_else(|| ConfigError::MissingParent {
                    key: config.key_path(&owned_key),
                })?;
                let style = rule_set.value_or_default(CODE_STYLE_KEY, String::new())?;
                let chosen = if style == variant {
                    variant_default.clone()
                } else {
                    default.clone()
                };
                let raw = config.value_or_default(&owned_key, chosen)?;
                apply(&config, &owned_key, raw, &transform)
            }),
        )
    }
}

fn apply<D, T, F>(config: &Config, key: &str, raw: D, transform: &F) -> Result<T, ConfigError>
where
    F: Fn(D) -> Result<T, String>,
{
    transform(raw).map_err(|message| ConfigError::InvalidValue {
        key: config.key_path(key),
        message,
    })
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("key", &self.key)
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}

/// A configured value with an optional explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueWithReason {
    /// The value itself.
    pub value: String,
    /// Why the value is listed.
    pub reason: Option<String>,
}

/// A list of [`ValueWithReason`].
///
/// Configured either as a list of strings or as a list of maps with a
/// `value` key and an optional `reason` key:
///
/// ```toml
/// forbiddenMethods = [
///     "std::process::exit",
///     { value = "dbg", reason = "debug output left behind" },
/// ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuesWithReason(pub Vec<ValueWithReason>);

impl ValuesWithReason {
    /// Builds a list from plain values without reasons.
    #[must_use]
    pub fn plain<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            values
                .into_iter()
                .map(|value| ValueWithReason {
                    value: value.into(),
                    reason: None,
                })
                .collect(),
        )
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, ValueWithReason> {
        self.0.iter()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromConfigValue for ValuesWithReason {
    const EXPECTED: &'static str = "a list of strings or of maps with 'value' and optional 'reason'";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        let ConfigValue::List(items) = value else {
            return None;
        };
        items
            .iter()
            .map(|item| match item {
                ConfigValue::String(value) => Some(ValueWithReason {
                    value: value.clone(),
                    reason: None,
                }),
                ConfigValue::Map(map) => {
                    let value = map.get("value")?.as_str()?.to_string();
                    let reason = match map.get("reason") {
                        None => None,
                        Some(reason) => Some(reason.as_str()?.to_string()),
                    };
                    Some(ValueWithReason { value, reason })
                }
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn rule_scope(toml: &str) -> Config {
        Config::from_toml_str(toml)
            .unwrap()
            .sub_config("style")
            .sub_config("MyRule")
    }

    #[test]
    fn configured_value_wins_over_default() {
        let config = rule_scope("[style.MyRule]\nthreshold = 10");
        let threshold = Property::new(&config, "threshold", 5_i64);
        assert_eq!(*threshold.get().unwrap(), 10);
        assert_eq!(threshold.key(), "threshold");
    }

    #[test]
    fn resolves_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let config = rule_scope("[style.MyRule]\nthreshold = 10");
        let doubled = Property::with_transform(&config, "threshold", 5_i64, move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v * 2
        });
        assert_eq!(*doubled.get().unwrap(), 20);
        assert_eq!(*doubled.get().unwrap(), 20);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_access_resolves_once() {
        const THREADS: usize = 8;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let config = rule_scope("[style.MyRule]\nthreshold = 10");
        let slow = Property::with_transform(&config, "threshold", 5_i64, move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            v + 1
        });
        let barrier = std::sync::Barrier::new(THREADS);

        let seen: Vec<(i64, usize)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        let value = slow.get().unwrap();
                        (*value, value as *const i64 as usize)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.iter().all(|&(value, _)| value == 11));
        assert!(seen.iter().all(|&(_, address)| address == seen[0].1));
    }

    #[test]
    fn shape_errors_are_memoized_too() {
        let config = rule_scope("[style.MyRule]\nthreshold = \"many\"");
        let threshold = Property::new(&config, "threshold", 5_i64);
        assert!(threshold.get().is_err());
        let err = threshold.get().unwrap_err();
        assert!(err.to_string().contains("style>MyRule>threshold"));
    }

    #[test]
    fn transform_errors_name_the_key() {
        let config = rule_scope("[style.MyRule]\npattern = \"[\"");
        let pattern = Property::with_try_transform(&config, "pattern", String::new(), |p| {
            if p.starts_with('[') {
                Err("unclosed bracket".to_string())
            } else {
                Ok(p)
            }
        });
        match pattern.get().unwrap_err() {
            ConfigError::InvalidValue { key, message } => {
                assert_eq!(key, "style>MyRule>pattern");
                assert_eq!(message, "unclosed bracket");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fallback_order_is_own_then_fallback_then_default() {
        let ok = |v: String| Ok::<_, String>(v);

        let own = rule_scope("[style.MyRule]\nfunctionPattern = \"own\"\npattern = \"old\"");
        let property = Property::with_fallback(&own, "functionPattern", "pattern", "def".to_string(), ok);
        assert_eq!(property.get().unwrap(), "own");

        let old = rule_scope("[style.MyRule]\npattern = \"old\"");
        let property = Property::with_fallback(&old, "functionPattern", "pattern", "def".to_string(), ok);
        assert_eq!(property.get().unwrap(), "old");

        let none = rule_scope("[style.MyRule]\nactive = true");
        let property = Property::with_fallback(&none, "functionPattern", "pattern", "def".to_string(), ok);
        assert_eq!(property.get().unwrap(), "def");
    }

    #[test]
    fn empty_own_list_wins_over_fallback() {
        let config = rule_scope("[style.MyRule]\nignored = []\nexcluded = [\"a\"]");
        let property = Property::with_fallback(
            &config,
            "ignored",
            "excluded",
            vec!["default".to_string()],
            Ok::<_, String>,
        );
        assert!(property.get().unwrap().is_empty());
    }

    #[test]
    fn variant_default_follows_rule_set_code_style() {
        let ok = |v: i64| Ok::<_, String>(v);

        let variant = rule_scope("[style]\ncode_style = \"rustfmt\"");
        let property = Property::with_variant(&variant, "maxLineLength", 120, "rustfmt", 100, ok);
        assert_eq!(*property.get().unwrap(), 100);

        let plain = rule_scope("[style]\nactive = true");
        let property = Property::with_variant(&plain, "maxLineLength", 120, "rustfmt", 100, ok);
        assert_eq!(*property.get().unwrap(), 120);

        let explicit = rule_scope("[style]\ncode_style = \"rustfmt\"\n[style.MyRule]\nmaxLineLength = 80");
        let property = Property::with_variant(&explicit, "maxLineLength", 120, "rustfmt", 100, ok);
        assert_eq!(*property.get().unwrap(), 80);
    }

    #[test]
    fn variant_without_parent_is_an_error() {
        let root = Config::empty();
        let property = Property::with_variant(&root, "maxLineLength", 120, "rustfmt", 100, Ok::<i64, String>);
        assert!(matches!(property.get(), Err(ConfigError::MissingParent { .. })));
    }

    #[test]
    fn values_with_reason_accepts_both_forms() {
        let config = rule_scope(
            "[style.MyRule]\nforbidden = [\"exit\", { value = \"dbg\", reason = \"debug output\" }]",
        );
        let property = Property::new(&config, "forbidden", ValuesWithReason::default());
        let values = property.get().unwrap();
        assert_eq!(values.0.len(), 2);
        assert_eq!(values.0[0].reason, None);
        assert_eq!(values.0[1].value, "dbg");
        assert_eq!(values.0[1].reason.as_deref(), Some("debug output"));
    }

    #[test]
    fn values_with_reason_rejects_other_shapes() {
        let config = rule_scope("[style.MyRule]\nforbidden = [{ reason = \"no value\" }]");
        let property = Property::new(&config, "forbidden", ValuesWithReason::default());
        let err = property.get().unwrap_err();
        assert!(err.to_string().contains("style>MyRule>forbidden"));
    }
}
