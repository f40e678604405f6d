//! Configuration file discovery and layering.

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::Path;
use tracing::debug;
use zonestats::RawConfig;

/// File name looked up in the home and current directories
pub const CONFIG_FILE: &str = ".zonestats";

/// Merge `$HOME/.zonestats`, `./.zonestats` and `explicit`, in that order.
pub fn load(explicit: Option<&Path>) -> Result<RawConfig> {
    let home = BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILE));
    load_from(home.as_deref(), Path::new(CONFIG_FILE), explicit)
}

/// Layer the given files. Missing default files are skipped, a missing
/// explicit file is an error.
pub fn load_from(home: Option<&Path>, cwd: &Path, explicit: Option<&Path>) -> Result<RawConfig> {
    let mut config = RawConfig::default();

    if let Some(home) = home {
        config = config.merge(read_optional(home)?);
    }
    config = config.merge(read_optional(cwd)?);
    if let Some(path) = explicit {
        config = config.merge(read(path)?);
    }

    Ok(config)
}

/// Read one YAML configuration file. An empty file is an empty layer.
pub fn read(path: &Path) -> Result<RawConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let config: RawConfig = serde_yaml::from_str::<Option<RawConfig>>(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?
        .unwrap_or_default();

    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn read_optional(path: &Path) -> Result<RawConfig> {
    if path.exists() {
        read(path)
    } else {
        Ok(RawConfig::default())
    }
}
