use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Path to the user config file: `$HOME/.config/fel-tools.toml`
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Pick the explicit config path if given, otherwise the default user config path.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| CONFIG_PATH.clone())
}

/// Read the config file contents.
///
/// # Errors
/// Returns an error if no path could be determined or the file can't be read.
pub fn read_config_file(explicit: Option<&Path>) -> Result<String> {
    let path = resolve_config_path(explicit).context("Failed to determine config file path")?;
    fs::read_to_string(&path).with_context(|| format!("Failed to read config file: {}", path.display()))
}
