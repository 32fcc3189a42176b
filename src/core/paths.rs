//! Configuration file and password directory resolution.

use crate::constants;
use crate::models::config::PassgenConfig;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve the configuration file from CLI arg, env var, or the default
/// location. `None` means no file is present and built-in defaults apply.
pub fn resolve_config_path(config_arg: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = config_arg {
        return Some(path);
    }
    if let Ok(path) = env::var(constants::CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let default = PathBuf::from(constants::DEFAULT_CONFIG_PATH);
    default.is_file().then_some(default)
}

/// Load configuration; an explicitly named file must exist.
pub fn load_config(path: Option<&Path>) -> Result<PassgenConfig> {
    let Some(path) = path else {
        return Ok(PassgenConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("read passgen config {}", path.display()))?;
    let config: PassgenConfig = toml::from_str(&content)
        .with_context(|| format!("parse passgen config {}", path.display()))?;
    Ok(config)
}

/// Legacy password directory for `environment`.
pub fn legacy_password_dir(server_vardir: &Path, environment: &str) -> PathBuf {
    server_vardir
        .join("simp")
        .join("environments")
        .join(environment)
        .join("simp_autofiles")
        .join("gen_passwd")
}
