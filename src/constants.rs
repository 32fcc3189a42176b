//! Centralized constants for paths, permissions, and generation defaults.

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/simp/passgen.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "SIMP_PASSGEN_CONFIG";

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV_VAR: &str = "SIMP_PASSGEN_LOG";

/// Default puppet executable.
pub const DEFAULT_PUPPET_COMMAND: &str = "/opt/puppetlabs/bin/puppet";

/// Default puppet environment path.
pub const DEFAULT_ENVIRONMENT_PATH: &str = "/etc/puppetlabs/code/environments";

/// Default puppetserver vardir.
pub const DEFAULT_SERVER_VARDIR: &str = "/opt/puppetlabs/server/data/puppetserver";

/// Default service account owning generated password files.
pub const DEFAULT_PUPPET_USER: &str = "puppet";

/// Default service group owning generated password files.
pub const DEFAULT_PUPPET_GROUP: &str = "puppet";

/// Environment used when none is given.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Permission mode for password, salt and backup files.
pub const PASSWORD_FILE_MODE: u32 = 0o640;

/// Suffix of legacy salt files.
pub const SALT_SUFFIX: &str = ".salt";

/// Suffix of legacy single-generation backups.
pub const BACKUP_SUFFIX: &str = ".last";

/// Default generated password length.
pub const DEFAULT_PASSWORD_LENGTH: usize = 32;

/// Minimum acceptable password length.
pub const MINIMUM_PASSWORD_LENGTH: usize = 8;

/// Default generation complexity (alphanumeric only).
pub const DEFAULT_COMPLEXITY: u8 = 0;

/// Highest complexity understood by the generator.
pub const MAX_COMPLEXITY: u8 = 2;

/// Salt length for kv-backend records.
pub const SALT_LENGTH: usize = 16;

/// Number of enter/confirm rounds before interactive entry gives up.
pub const MAX_PASSWORD_ATTEMPTS: u32 = 5;

/// First simplib major version that ships the kv-backed passgen functions.
pub const SIMPLIB_KV_MAJOR_VERSION: u64 = 4;
