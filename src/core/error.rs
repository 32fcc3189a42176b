//! Error kinds raised by the password managers.

use thiserror::Error;

/// A failure scoped to one name inside a batch `set` or `remove`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerNameFailure {
    pub name: String,
    pub reason: String,
}

impl PerNameFailure {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PassgenError {
    /// Generation options are incomplete; raised before any I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown names requested for show/remove.
    #[error("Invalid name(s) in {location}: {invalid}\nValid names: {valid}")]
    Validation {
        location: String,
        invalid: String,
        valid: String,
    },

    #[error("Password directory '{0}' does not exist or is not a directory")]
    Directory(String),

    #[error("Access error for '{path}': {reason}")]
    Access { path: String, reason: String },

    #[error("Unknown or unusable environment '{name}': {reason}")]
    Environment { name: String, reason: String },

    /// Aggregate of the per-name failures captured during a batch.
    #[error("Failed to {action} {failed} of {total} passwords in {location}:\n{details}")]
    Batch {
        action: String,
        location: String,
        failed: usize,
        total: usize,
        details: String,
        failures: Vec<PerNameFailure>,
    },

    /// The external configuration tool exited non-zero.
    #[error("Command failed: {command}\n{stderr}")]
    Delegate { command: String, stderr: String },

    #[error("Unable to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("Unable to read input: {0}")]
    Prompt(String),

    #[error("Too many failed attempts to enter password for '{0}'")]
    PromptExhaustion(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PassgenError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Per-name failures carried by a batch error, empty for every other kind.
    pub fn failures(&self) -> &[PerNameFailure] {
        match self {
            Self::Batch { failures, .. } => failures,
            _ => &[],
        }
    }
}

pub type Result<T, E = PassgenError> = std::result::Result<T, E>;
