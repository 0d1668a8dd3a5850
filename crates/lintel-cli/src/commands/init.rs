//! Init command implementation.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

const HEADER: &str = "# lintel configuration
#
# Keys set here are layered over the built-in defaults below; remove what
# you do not change. Run `lintel list-rules` to see every rule.

";

/// Writes `lintel.toml` with the built-in defaults into `dir`.
///
/// Returns the written path.
pub fn run(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join("lintel.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let content = format!("{HEADER}{}", lintel_rules::DEFAULT_CONFIG);
    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Edit lintel.toml to configure rules");
    println!("  2. Run: lintel check");

    Ok(config_path)
}
