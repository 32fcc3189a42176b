//! Passgen configuration file model.

use crate::constants;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassgenConfig {
    #[serde(default)]
    pub puppet: PuppetSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuppetSection {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_environment_path")]
    pub environment_path: String,
    /// Puppetserver vardir; root of the legacy password tree and the
    /// `--vardir` handed to `puppet apply`.
    #[serde(default = "default_server_vardir")]
    pub server_vardir: String,
    /// Owner of generated legacy files. An empty string skips chown.
    #[serde(default = "default_user")]
    pub user: Option<String>,
    #[serde(default = "default_group")]
    pub group: Option<String>,
    /// Kill `puppet apply` after this many seconds (unset blocks until exit).
    #[serde(default)]
    pub apply_timeout_secs: Option<u64>,
}

impl Default for PuppetSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            environment_path: default_environment_path(),
            server_vardir: default_server_vardir(),
            user: default_user(),
            group: default_group(),
            apply_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default = "default_length")]
    pub default_length: usize,
    #[serde(default = "minimum_length")]
    pub minimum_length: usize,
    #[serde(default)]
    pub default_complexity: u8,
    #[serde(default)]
    pub default_complex_only: bool,
    /// Path to a cracklib-check binary used to vet entered passwords.
    #[serde(default)]
    pub cracklib_check: Option<String>,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            default_length: default_length(),
            minimum_length: minimum_length(),
            default_complexity: constants::DEFAULT_COMPLEXITY,
            default_complex_only: false,
            cracklib_check: None,
        }
    }
}

fn default_command() -> String {
    constants::DEFAULT_PUPPET_COMMAND.to_string()
}

fn default_environment_path() -> String {
    constants::DEFAULT_ENVIRONMENT_PATH.to_string()
}

fn default_server_vardir() -> String {
    constants::DEFAULT_SERVER_VARDIR.to_string()
}

fn default_user() -> Option<String> {
    Some(constants::DEFAULT_PUPPET_USER.to_string())
}

fn default_group() -> Option<String> {
    Some(constants::DEFAULT_PUPPET_GROUP.to_string())
}

fn default_length() -> usize {
    constants::DEFAULT_PASSWORD_LENGTH
}

fn minimum_length() -> usize {
    constants::MINIMUM_PASSWORD_LENGTH
}
