//! Operation surface shared by the legacy and kv password managers.

use crate::core::environment::{self, BackendKind};
use crate::core::error::{PassgenError, Result};
use crate::core::kv::PasswordManager;
use crate::core::legacy::LegacyPasswordManager;
use crate::models::config::PassgenConfig;
use crate::models::location::Location;
use crate::models::options::GenerationOptions;
use crate::util::fs::Ownership;
use crate::util::prompt::Prompter;
use crate::util::puppet::PuppetApply;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Stored generation settings and history depth of a kv record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDetails {
    pub complexity: Option<u8>,
    pub complex_only: Option<bool>,
    pub history_len: usize,
}

/// What `show` reports for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordInfo {
    pub name: String,
    pub current: String,
    pub previous: Option<String>,
    pub details: Option<RecordDetails>,
}

/// What `set` did for one name.
#[derive(Debug)]
pub struct SetOutcome {
    pub name: String,
    /// The new value when it was generated rather than typed in.
    pub generated: Option<Zeroizing<String>>,
}

/// What `remove` did for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Files deleted; empty for the kv backend.
    Removed { files: Vec<PathBuf> },
    /// The operator declined the confirmation.
    Declined,
}

/// A password manager bound to one location.
pub trait PasswordStore {
    /// Human-readable label of the location.
    fn location(&self) -> String;

    /// Sorted names present in the location.
    fn name_list(&mut self) -> Result<Vec<String>>;

    /// Sub-folders of the location, where the backend has them.
    fn folder_list(&mut self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn show(&mut self, names: &[String]) -> Result<Vec<PasswordInfo>>;

    fn set(&mut self, names: &[String], options: &GenerationOptions) -> Result<Vec<SetOutcome>>;

    fn remove(&mut self, names: &[String], force: bool) -> Result<Vec<(String, RemoveOutcome)>>;
}

/// Where the caller wants to operate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    pub environment: String,
    /// Explicit legacy password directory.
    pub dir: Option<PathBuf>,
    pub backend: Option<String>,
    pub folder: Option<String>,
}

/// Pick the manager for `target`: an explicit directory or a pre-4.0 simplib
/// selects the flat-file store, anything newer the kv store.
pub fn open_store<P: Prompter + 'static>(
    config: &PassgenConfig,
    target: &StoreTarget,
    prompter: P,
) -> Result<Box<dyn PasswordStore>> {
    let puppet = &config.puppet;
    let cracklib = config.generation.cracklib_check.as_ref().map(PathBuf::from);

    let kind = match &target.dir {
        Some(_) => BackendKind::Legacy,
        None => {
            let env_dir = environment::environment_dir(
                Path::new(&puppet.environment_path),
                &target.environment,
            )?;
            environment::detect_backend(&env_dir)?
        }
    };

    match kind {
        BackendKind::Legacy => {
            if target.backend.is_some() || target.folder.is_some() {
                return Err(PassgenError::Configuration(
                    "backend and folder selection require simplib 4.0.0 or later".into(),
                ));
            }
            let manager = LegacyPasswordManager::new(
                &target.environment,
                Path::new(&puppet.server_vardir),
                target.dir.clone(),
                prompter,
            )
            .with_ownership(Ownership::new(puppet.user.clone(), puppet.group.clone()))
            .with_cracklib_check(cracklib);
            Ok(Box::new(manager))
        }
        BackendKind::Kv => {
            let runner = PuppetApply::new(puppet.command.clone())
                .with_group(puppet.group.clone())
                .with_timeout(puppet.apply_timeout_secs.map(Duration::from_secs));
            let location = Location::new(target.environment.clone())
                .with_backend(target.backend.clone())
                .with_folder(target.folder.clone());
            let manager = PasswordManager::new(
                location,
                PathBuf::from(&puppet.server_vardir),
                runner,
                prompter,
            )
            .with_cracklib_check(cracklib);
            Ok(Box::new(manager))
        }
    }
}
