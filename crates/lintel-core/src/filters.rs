//! `includes` / `excludes` path filters of rule sets and rules.

use crate::config::{Config, ConfigError, EXCLUDES_KEY, INCLUDES_KEY};
use glob::Pattern;
use std::path::Path;

/// Glob based file filter read from a config scope.
///
/// A non-empty include list decides alone: only matching files are analyzed.
/// Otherwise files matching any exclude are skipped.
#[derive(Debug, Clone, Default)]
pub struct PathFilters {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl PathFilters {
    /// Reads `includes` and `excludes` from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the key for an invalid glob.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            includes: compile(config, INCLUDES_KEY)?,
            excludes: compile(config, EXCLUDES_KEY)?,
        })
    }

    /// Returns true if neither list has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Returns true if `path` must not be analyzed.
    ///
    /// Patterns are tried against `path` as given and relative to `base`.
    #[must_use]
    pub fn is_ignored(&self, path: &Path, base: &Path) -> bool {
        let relative = path.strip_prefix(base).unwrap_or(path);
        let matches = |pattern: &Pattern| pattern.matches_path(path) || pattern.matches_path(relative);
        if !self.includes.is_empty() {
            return !self.includes.iter().any(matches);
        }
        self.excludes.iter().any(matches)
    }
}

fn compile(config: &Config, key: &str) -> Result<Vec<Pattern>, ConfigError> {
    config
        .value_or_default::<Vec<String>>(key, Vec::new())?
        .iter()
        .map(|raw| {
            Pattern::new(raw).map_err(|e| ConfigError::InvalidValue {
                key: config.key_path(key),
                message: format!("invalid glob '{raw}': {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(toml: &str) -> PathFilters {
        let config = Config::from_toml_str(toml).unwrap().sub_config("style");
        PathFilters::from_config(&config).unwrap()
    }

    #[test]
    fn empty_filters_ignore_nothing() {
        let f = filters("[style]\nactive = true");
        assert!(f.is_empty());
        assert!(!f.is_ignored(Path::new("src/lib.rs"), Path::new(".")));
    }

    #[test]
    fn excludes_match_relative_paths() {
        let f = filters("[style]\nexcludes = [\"tests/**\"]");
        let base = Path::new("/project");
        assert!(f.is_ignored(Path::new("/project/tests/it.rs"), base));
        assert!(!f.is_ignored(Path::new("/project/src/lib.rs"), base));
    }

    #[test]
    fn includes_decide_alone() {
        let f = filters("[style]\nincludes = [\"src/**\"]\nexcludes = [\"src/**\"]");
        let base = Path::new("/project");
        assert!(!f.is_ignored(Path::new("/project/src/lib.rs"), base));
        assert!(f.is_ignored(Path::new("/project/benches/b.rs"), base));
    }

    #[test]
    fn invalid_glob_names_the_key() {
        let config = Config::from_toml_str("[style]\nexcludes = [\"a/***\"]")
            .unwrap()
            .sub_config("style");
        let err = PathFilters::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("style>excludes"));
    }
}
