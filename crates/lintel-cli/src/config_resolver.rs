//! User configuration lookup.
//!
//! The first hit wins:
//!
//! 1. `--config` flag (explicit path)
//! 2. `{project}/lintel.toml` or `{project}/.lintel.toml`
//! 3. `$LINTEL_CONFIG_DIR/config.toml` or `~/.lintel/config.toml`
//! 4. Nothing: the built-in defaults run alone
//!
//! The resolved document is the primary side of the composite config; the
//! defaults of `lintel-rules` are layered beneath it by the analyzer.

use lintel_core::{Config, ConfigError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the user configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found in the analyzed project.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// No user configuration.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Reads the user document, or an empty config when none was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(&self) -> Result<Config, ConfigError> {
        match self {
            Self::Default => {
                debug!("No user config found, using defaults only");
                Ok(Config::empty())
            }
            Self::Global(p) => {
                info!("Using global config: {}", p.display());
                Config::from_file(p)
            }
            Self::Explicit(p) | Self::Project(p) => {
                debug!("Using config: {}", p.display());
                Config::from_file(p)
            }
        }
    }
}

/// Project-level config file names, checked in order.
pub const PROJECT_CONFIG_NAMES: &[&str] = &["lintel.toml", ".lintel.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Environment variable overriding the global config directory.
pub const CONFIG_DIR_ENV: &str = "LINTEL_CONFIG_DIR";

/// Resolves the user configuration for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, global_config_dir())
}

// Takes the global directory as a parameter so tests need no env vars.
fn resolve_in(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    let project = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.is_file());
    if let Some(candidate) = project {
        return ConfigSource::Project(candidate);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|candidate| candidate.is_file())
        .map_or(ConfigSource::Default, ConfigSource::Global)
}

/// `$LINTEL_CONFIG_DIR`, else `~/.lintel`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".lintel"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_is_trusted_as_is() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("lintel.toml"), "").unwrap();

        let explicit = Path::new("/nonexistent/custom.toml");
        assert_eq!(
            resolve_in(project.path(), Some(explicit), None),
            ConfigSource::Explicit(explicit.to_path_buf())
        );
    }

    #[test]
    fn plain_name_preferred_over_dot_name() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(".lintel.toml"), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join(".lintel.toml"))
        );

        fs::write(project.path().join("lintel.toml"), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, None),
            ConfigSource::Project(project.path().join("lintel.toml"))
        );
    }

    #[test]
    fn global_only_when_project_has_none() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let global_dir = Some(global.path().to_path_buf());
        assert_eq!(resolve_in(project.path(), None, global_dir.clone()), ConfigSource::Default);

        fs::write(global.path().join("config.toml"), "").unwrap();
        assert_eq!(
            resolve_in(project.path(), None, global_dir.clone()),
            ConfigSource::Global(global.path().join("config.toml"))
        );

        fs::write(project.path().join("lintel.toml"), "").unwrap();
        assert!(matches!(
            resolve_in(project.path(), None, global_dir),
            ConfigSource::Project(_)
        ));
    }

    #[test]
    fn load_reads_the_document() {
        let project = TempDir::new().unwrap();
        let path = project.path().join("lintel.toml");
        fs::write(&path, "[style.MaxLineLength]\nmaxLineLength = 80\n").unwrap();

        let config = ConfigSource::Project(path).load().unwrap();
        let value: Option<i64> = config
            .sub_config("style")
            .sub_config("MaxLineLength")
            .value_or_none("maxLineLength")
            .unwrap();
        assert_eq!(value, Some(80));

        assert!(ConfigSource::Default.load().unwrap().is_empty());
        assert!(ConfigSource::Explicit(project.path().join("missing.toml")).load().is_err());
    }
}
