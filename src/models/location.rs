//! Addressing of a password set: environment, kv backend, and folder, or an
//! explicit legacy password directory.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub environment: String,
    /// Named kv backend, or the environment's default.
    pub backend: Option<String>,
    /// Kv folder, or the top folder.
    pub folder: Option<String>,
    /// Explicit legacy password directory, replacing the environment's.
    pub directory: Option<PathBuf>,
}

impl Location {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            backend: None,
            folder: None,
            directory: None,
        }
    }

    pub fn with_backend(mut self, backend: Option<String>) -> Self {
        self.backend = backend.filter(|b| !b.is_empty());
        self
    }

    pub fn with_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder
            .map(|f| f.trim_matches('/').to_string())
            .filter(|f| !f.is_empty());
        self
    }

    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Label for the flat-file layout, which has no backend or folder.
    pub fn legacy_label(&self) -> String {
        match &self.directory {
            Some(dir) => format!("'{}'", dir.display()),
            None => format!("'{}' Environment", self.environment),
        }
    }

    /// Key path of `name` within this location: `folder/name` or `name`.
    pub fn fullname(&self, name: &str) -> String {
        match &self.folder {
            Some(folder) => format!("{}/{}", folder, name),
            None => name.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' Environment", self.environment)?;
        match &self.folder {
            Some(folder) => write!(f, ", '{}' Folder", folder)?,
            None => write!(f, ", top folder")?,
        }
        match &self.backend {
            Some(backend) => write!(f, ", '{}' simpkv Backend", backend),
            None => write!(f, ", default simpkv Backend"),
        }
    }
}
