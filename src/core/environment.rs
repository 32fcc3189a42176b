//! Puppet environment discovery and backend detection.

use crate::constants;
use crate::core::error::{PassgenError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Which password storage generation an environment's simplib understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Legacy,
    Kv,
}

#[derive(Debug, Deserialize)]
struct ModuleMetadata {
    version: String,
}

/// Sorted environment names under `environment_path`.
pub fn list_environments(environment_path: &Path) -> Result<Vec<String>> {
    let dir = fs::read_dir(environment_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            PassgenError::Access {
                path: environment_path.display().to_string(),
                reason: e.to_string(),
            }
        } else {
            PassgenError::Directory(environment_path.display().to_string())
        }
    })?;
    let mut names = Vec::new();
    for entry in dir {
        let entry = entry.map_err(|e| {
            PassgenError::io(format!("read {}", environment_path.display()), e)
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Directory of `environment`, or an error listing the known environments.
pub fn environment_dir(environment_path: &Path, environment: &str) -> Result<PathBuf> {
    let dir = environment_path.join(environment);
    if dir.is_dir() && !environment.contains('/') {
        return Ok(dir);
    }
    let known = list_environments(environment_path)
        .map(|envs| envs.join(", "))
        .unwrap_or_default();
    Err(PassgenError::Environment {
        name: environment.to_string(),
        reason: format!("valid environments: {}", known),
    })
}

/// Version string from `<env>/modules/simplib/metadata.json`.
pub fn simplib_version(env_dir: &Path) -> Result<String> {
    let path = env_dir.join("modules").join("simplib").join("metadata.json");
    let content = fs::read_to_string(&path).map_err(|_| PassgenError::Environment {
        name: env_dir.display().to_string(),
        reason: format!("simplib module not found ({} unreadable)", path.display()),
    })?;
    let meta: ModuleMetadata = serde_json::from_str(&content)
        .map_err(|e| PassgenError::parse(path.display().to_string(), e.to_string()))?;
    Ok(meta.version)
}

/// simplib releases before 4.0.0 only know the flat-file layout.
pub fn backend_for_version(version: &str) -> Result<BackendKind> {
    let major = version
        .trim()
        .trim_start_matches('v')
        .split(['.', '-'])
        .next()
        .and_then(|m| m.parse::<u64>().ok())
        .ok_or_else(|| PassgenError::parse("simplib version", version.to_string()))?;
    if major < constants::SIMPLIB_KV_MAJOR_VERSION {
        Ok(BackendKind::Legacy)
    } else {
        Ok(BackendKind::Kv)
    }
}

pub fn detect_backend(env_dir: &Path) -> Result<BackendKind> {
    let version = simplib_version(env_dir)?;
    let kind = backend_for_version(&version)?;
    tracing::debug!(env = %env_dir.display(), %version, ?kind, "detected simplib");
    Ok(kind)
}
