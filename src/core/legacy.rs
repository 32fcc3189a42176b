//! Flat-file password store used by simplib releases before the simpkv
//! rewrite: one file per name with optional `.salt`, `.last` and
//! `.salt.last` siblings.

use crate::constants;
use crate::core::batch::{run_batch, ItemError};
use crate::core::error::{PassgenError, Result};
use crate::core::names::validate_names;
use crate::core::negotiator::{merge_password_options, ExistingSettings, PasswordNegotiator};
use crate::core::store::{PasswordInfo, PasswordStore, RemoveOutcome, SetOutcome};
use crate::models::location::Location;
use crate::models::options::{GenerationOptions, RequiredOptions, REQUIRED_KEYS};
use crate::util::fs::{self as passgen_fs, Ownership};
use crate::util::prompt::Prompter;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Mode for a password directory created by `set`.
const PASSWORD_DIR_MODE: u32 = 0o750;

/// The four files that make up one legacy entry.
#[derive(Debug, Clone)]
struct EntryPaths {
    current: PathBuf,
    salt: PathBuf,
    backup: PathBuf,
    backup_salt: PathBuf,
}

impl EntryPaths {
    fn new(dir: &Path, name: &str) -> Self {
        let salt = format!("{}{}", name, constants::SALT_SUFFIX);
        Self {
            current: dir.join(name),
            backup: dir.join(format!("{}{}", name, constants::BACKUP_SUFFIX)),
            backup_salt: dir.join(format!("{}{}", salt, constants::BACKUP_SUFFIX)),
            salt: dir.join(salt),
        }
    }
}

fn read_first_line(path: &Path) -> io::Result<String> {
    let file = fs::File::open(path)?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub struct LegacyPasswordManager<P: Prompter> {
    location: Location,
    password_dir: PathBuf,
    ownership: Ownership,
    cracklib_check: Option<PathBuf>,
    prompter: P,
}

impl<P: Prompter> LegacyPasswordManager<P> {
    /// Manage `<server_vardir>/simp/environments/<env>/simp_autofiles/gen_passwd`
    /// or `dir_override` when given.
    pub fn new(
        environment: &str,
        server_vardir: &Path,
        dir_override: Option<PathBuf>,
        prompter: P,
    ) -> Self {
        let location = Location::new(environment).with_directory(dir_override);
        let password_dir = location
            .directory()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| crate::core::paths::legacy_password_dir(server_vardir, environment));
        Self {
            location,
            password_dir,
            ownership: Ownership::default(),
            cracklib_check: None,
            prompter,
        }
    }

    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    pub fn with_cracklib_check(mut self, cracklib_check: Option<PathBuf>) -> Self {
        self.cracklib_check = cracklib_check;
        self
    }

    pub fn password_dir(&self) -> &Path {
        &self.password_dir
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    fn check_password_dir(&self) -> Result<()> {
        let dir = &self.password_dir;
        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(PassgenError::Directory(dir.display().to_string())),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(PassgenError::Access {
                path: dir.display().to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(PassgenError::Directory(dir.display().to_string())),
        }
    }

    fn read_error(&self, e: io::Error) -> PassgenError {
        if e.kind() == io::ErrorKind::PermissionDenied {
            PassgenError::Access {
                path: self.password_dir.display().to_string(),
                reason: e.to_string(),
            }
        } else {
            PassgenError::io(format!("read {}", self.password_dir.display()), e)
        }
    }

    fn set_one(
        &mut self,
        location: &str,
        name: &str,
        options: &GenerationOptions,
        required: &RequiredOptions,
    ) -> Result<SetOutcome, ItemError> {
        let paths = EntryPaths::new(&self.password_dir, name);

        let existing_length = if paths.current.is_file() {
            let current = read_first_line(&paths.current).map_err(|e| {
                ItemError::failed(format!("unable to read {}: {}", paths.current.display(), e))
            })?;
            Some(current.chars().count())
        } else {
            None
        };
        let existing = ExistingSettings {
            length: existing_length,
            ..Default::default()
        };
        let effective = merge_password_options(options, required, &existing);

        let new_password = PasswordNegotiator::new(&mut self.prompter, self.cracklib_check.as_deref())
            .negotiate(name, &effective)
            .map_err(ItemError::Fatal)?;

        rotate_backups(&paths, existing_length.is_some()).map_err(ItemError::failed)?;

        fs::write(&paths.current, format!("{}\n", new_password.value.as_str())).map_err(|e| {
            ItemError::failed(format!("unable to write {}: {}", paths.current.display(), e))
        })?;
        passgen_fs::set_permissions(&paths.current, constants::PASSWORD_FILE_MODE)
            .and_then(|_| self.ownership.apply(&paths.current))
            .map_err(|e| ItemError::failed(format!("{:#}", e)))?;

        tracing::info!(name, dir = %self.password_dir.display(), "password set");
        self.prompter.say(&format!("  '{}' password set in {}", name, location));
        if new_password.generated {
            self.prompter
                .say(&format!("    New password: {}", new_password.value.as_str()));
        }

        Ok(SetOutcome {
            name: name.to_string(),
            generated: new_password.generated.then_some(new_password.value),
        })
    }

    fn remove_one(&mut self, name: &str, force: bool) -> Result<RemoveOutcome, ItemError> {
        if !force {
            let prompt = format!("Are you sure you want to remove all entries for '{}'?", name);
            let confirmed = self
                .prompter
                .confirm(&prompt, false)
                .map_err(|e| ItemError::Fatal(PassgenError::Prompt(format!("{:#}", e))))?;
            if !confirmed {
                self.prompter.say(&format!("  Skipped '{}'", name));
                return Ok(RemoveOutcome::Declined);
            }
        }

        let paths = EntryPaths::new(&self.password_dir, name);
        let mut files = Vec::new();
        let mut errors = Vec::new();
        for path in [paths.current, paths.salt, paths.backup, paths.backup_salt] {
            if !exists(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    self.prompter.say(&format!("  Removed {}", path.display()));
                    files.push(path);
                }
                Err(e) => errors.push(format!("unable to remove {}: {}", path.display(), e)),
            }
        }

        if errors.is_empty() {
            tracing::info!(name, files = files.len(), "password removed");
            Ok(RemoveOutcome::Removed { files })
        } else {
            Err(ItemError::Failed(errors.join("; ")))
        }
    }
}

/// Make room for a new value. A replaced value and its salt move to their
/// single-generation backups; a brand-new name starts with no backups.
fn rotate_backups(paths: &EntryPaths, replacing: bool) -> Result<()> {
    if replacing {
        rename(&paths.current, &paths.backup)?;
        if exists(&paths.salt) {
            return rename(&paths.salt, &paths.backup_salt);
        }
    } else {
        remove_if_exists(&paths.backup)?;
    }
    // A stale salt backup would pair with the wrong password.
    remove_if_exists(&paths.backup_salt)
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| {
        PassgenError::io(
            format!("unable to back up {} to {}", from.display(), to.display()),
            e,
        )
    })
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if !exists(path) {
        return Ok(());
    }
    fs::remove_file(path)
        .map_err(|e| PassgenError::io(format!("unable to remove {}", path.display()), e))
}

impl<P: Prompter> PasswordStore for LegacyPasswordManager<P> {
    fn location(&self) -> String {
        self.location.legacy_label()
    }

    fn name_list(&mut self) -> Result<Vec<String>> {
        self.check_password_dir()?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.password_dir).map_err(|e| self.read_error(e))? {
            let entry = entry.map_err(|e| self.read_error(e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if file_name.ends_with(constants::SALT_SUFFIX) || file_name.ends_with(constants::BACKUP_SUFFIX)
            {
                continue;
            }
            names.push(file_name.to_string());
        }
        names.sort();
        Ok(names)
    }

    fn show(&mut self, names: &[String]) -> Result<Vec<PasswordInfo>> {
        let valid = self.name_list()?;
        validate_names(names, &valid, &self.location())?;

        names
            .iter()
            .map(|name| {
                let paths = EntryPaths::new(&self.password_dir, name);
                let current = read_first_line(&paths.current)
                    .map_err(|e| PassgenError::io(format!("read {}", paths.current.display()), e))?;
                let previous = if paths.backup.is_file() {
                    Some(read_first_line(&paths.backup).map_err(|e| {
                        PassgenError::io(format!("read {}", paths.backup.display()), e)
                    })?)
                } else {
                    None
                };
                Ok(PasswordInfo {
                    name: name.clone(),
                    current,
                    previous,
                    details: None,
                })
            })
            .collect()
    }

    fn set(&mut self, names: &[String], options: &GenerationOptions) -> Result<Vec<SetOutcome>> {
        let required = options.require(REQUIRED_KEYS)?;

        if exists(&self.password_dir) {
            self.check_password_dir()?;
        } else {
            passgen_fs::ensure_dir(&self.password_dir, PASSWORD_DIR_MODE)
                .and_then(|_| self.ownership.apply(&self.password_dir))
                .map_err(|e| PassgenError::Access {
                    path: self.password_dir.display().to_string(),
                    reason: format!("{:#}", e),
                })?;
        }

        let location = self.location();
        let done = run_batch("set", &location, names, |name| {
            self.set_one(&location, name, options, &required)
        })?;
        Ok(done.into_iter().map(|(_, outcome)| outcome).collect())
    }

    fn remove(&mut self, names: &[String], force: bool) -> Result<Vec<(String, RemoveOutcome)>> {
        let valid = self.name_list()?;
        let location = self.location();
        validate_names(names, &valid, &location)?;
        run_batch("remove", &location, names, |name| self.remove_one(name, force))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::prompt::ScriptedPrompter;
    use tempfile::TempDir;

    fn options(auto_gen: bool) -> GenerationOptions {
        GenerationOptions {
            auto_gen: Some(auto_gen),
            force_value: Some(true),
            default_length: Some(32),
            minimum_length: Some(8),
            ..Default::default()
        }
    }

    fn manager(dir: &TempDir, prompter: ScriptedPrompter) -> LegacyPasswordManager<ScriptedPrompter> {
        LegacyPasswordManager::new(
            "production",
            Path::new("/unused"),
            Some(dir.path().to_path_buf()),
            prompter,
        )
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn write(dir: &TempDir, file: &str, content: &str) {
        fs::write(dir.path().join(file), content).unwrap();
    }

    #[test]
    fn test_default_password_dir() {
        let mgr = LegacyPasswordManager::new(
            "dev",
            Path::new("/opt/puppetlabs/server/data/puppetserver"),
            None,
            ScriptedPrompter::new(),
        );
        assert_eq!(
            mgr.password_dir(),
            Path::new("/opt/puppetlabs/server/data/puppetserver/simp/environments/dev/simp_autofiles/gen_passwd")
        );
        assert_eq!(mgr.location(), "'dev' Environment");
    }

    #[test]
    fn test_name_list_skips_salt_backup_and_dirs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "beta", "b\n");
        write(&dir, "alpha", "a\n");
        write(&dir, "alpha.salt", "s\n");
        write(&dir, "alpha.last", "old\n");
        write(&dir, "alpha.salt.last", "olds\n");
        fs::create_dir(dir.path().join("subdir")).unwrap();
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        assert_eq!(mgr.name_list().unwrap(), names(&["alpha", "beta"]));
    }

    #[test]
    fn test_name_list_missing_dir() {
        let dir = TempDir::new().unwrap();
        let mut mgr = LegacyPasswordManager::new(
            "production",
            Path::new("/unused"),
            Some(dir.path().join("missing")),
            ScriptedPrompter::new(),
        );
        assert!(matches!(mgr.name_list(), Err(PassgenError::Directory(_))));
    }

    #[test]
    fn test_name_list_not_a_directory() {
        let dir = TempDir::new().unwrap();
        write(&dir, "file", "x");
        let mut mgr = LegacyPasswordManager::new(
            "production",
            Path::new("/unused"),
            Some(dir.path().join("file")),
            ScriptedPrompter::new(),
        );
        assert!(matches!(mgr.name_list(), Err(PassgenError::Directory(_))));
    }

    #[test]
    fn test_show_current_and_previous() {
        let dir = TempDir::new().unwrap();
        write(&dir, "db", "current-pw\nignored\n");
        write(&dir, "db.last", "old-pw\n");
        write(&dir, "web", "web-pw\n");
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let info = mgr.show(&names(&["db", "web"])).unwrap();
        assert_eq!(info[0].current, "current-pw");
        assert_eq!(info[0].previous.as_deref(), Some("old-pw"));
        assert_eq!(info[1].current, "web-pw");
        assert_eq!(info[1].previous, None);
    }

    #[test]
    fn test_show_unknown_name() {
        let dir = TempDir::new().unwrap();
        for n in ["a", "b", "c"] {
            write(&dir, n, "x\n");
        }
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let err = mgr.show(&names(&["oops"])).unwrap_err();
        assert!(err.to_string().contains("Valid names: a, b, c"));
    }

    #[test]
    fn test_set_creates_without_backup() {
        let dir = TempDir::new().unwrap();
        let prompter = ScriptedPrompter::new().with_passwords(["first-value", "first-value"]);
        let mut mgr = manager(&dir, prompter);
        let out = mgr.set(&names(&["new"]), &options(false)).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].generated.is_none());
        assert_eq!(fs::read_to_string(dir.path().join("new")).unwrap(), "first-value\n");
        assert!(!dir.path().join("new.last").exists());
        assert!(!dir.path().join("new.salt.last").exists());

        let mode = {
            use std::os::unix::fs::PermissionsExt;
            fs::metadata(dir.path().join("new")).unwrap().permissions().mode() & 0o777
        };
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_set_backs_up_value_and_salt() {
        let dir = TempDir::new().unwrap();
        write(&dir, "db", "v0\n");
        write(&dir, "db.salt", "salt0\n");
        let prompter = ScriptedPrompter::new().with_passwords(["v1", "v1"]);
        let mut mgr = manager(&dir, prompter);
        mgr.set(&names(&["db"]), &options(false)).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("db")).unwrap(), "v1\n");
        assert_eq!(fs::read_to_string(dir.path().join("db.last")).unwrap(), "v0\n");
        assert_eq!(fs::read_to_string(dir.path().join("db.salt.last")).unwrap(), "salt0\n");
        assert!(!dir.path().join("db.salt").exists());
    }

    #[test]
    fn test_set_drops_stale_salt_backup() {
        let dir = TempDir::new().unwrap();
        write(&dir, "db", "v1\n");
        write(&dir, "db.salt.last", "stale\n");
        let prompter = ScriptedPrompter::new().with_passwords(["v2", "v2"]);
        let mut mgr = manager(&dir, prompter);
        mgr.set(&names(&["db"]), &options(false)).unwrap();
        assert!(!dir.path().join("db.salt.last").exists());
    }

    #[test]
    fn test_set_new_name_clears_orphaned_backups() {
        let dir = TempDir::new().unwrap();
        write(&dir, "n.last", "ancient\n");
        write(&dir, "n.salt.last", "ancient-salt\n");
        let prompter = ScriptedPrompter::new().with_passwords(["fresh", "fresh"]);
        let mut mgr = manager(&dir, prompter);
        mgr.set(&names(&["n"]), &options(false)).unwrap();

        let info = mgr.show(&names(&["n"])).unwrap();
        assert_eq!(info[0].current, "fresh");
        assert_eq!(info[0].previous, None);
        assert!(!dir.path().join("n.last").exists());
        assert!(!dir.path().join("n.salt.last").exists());
    }

    #[test]
    fn test_set_unremovable_orphan_fails_only_that_name() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("n.last")).unwrap();
        write(&dir, "n.last/keep", "x");
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let err = mgr.set(&names(&["n", "m"]), &options(true)).unwrap_err();

        assert!(matches!(err, PassgenError::Batch { failed: 1, total: 2, .. }));
        assert!(err.to_string().contains("'n': unable to remove"), "{}", err);
        assert!(!dir.path().join("n").exists());
        assert!(dir.path().join("m").is_file());
    }

    #[test]
    fn test_set_backup_failure_keeps_old_value_and_continues() {
        let dir = TempDir::new().unwrap();
        write(&dir, "db", "v0\n");
        fs::create_dir(dir.path().join("db.last")).unwrap();
        write(&dir, "db.last/keep", "x");
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let err = mgr.set(&names(&["db", "web"]), &options(true)).unwrap_err();

        assert!(matches!(err, PassgenError::Batch { failed: 1, total: 2, .. }));
        let msg = err.to_string();
        assert!(msg.contains("'db': unable to back up"), "{}", msg);
        assert!(!msg.contains("'web'"), "{}", msg);
        assert_eq!(fs::read_to_string(dir.path().join("db")).unwrap(), "v0\n");
        assert!(dir.path().join("web").is_file());
    }

    #[test]
    fn test_set_ownership_failure_reported_per_name() {
        let dir = TempDir::new().unwrap();
        let mut mgr = manager(&dir, ScriptedPrompter::new())
            .with_ownership(Ownership::new(Some("no-such-user-passgen".into()), None));
        let err = mgr.set(&names(&["a", "b"]), &options(true)).unwrap_err();

        assert!(matches!(err, PassgenError::Batch { failed: 2, total: 2, .. }));
        assert_eq!(err.failures()[0].name, "a");
        assert_eq!(err.failures()[1].name, "b");
        assert!(err.failures()[0].reason.contains("no-such-user-passgen"));
    }

    #[test]
    fn test_set_generated_keeps_existing_length() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ten", "0123456789\n");
        write(&dir, "seven", "0123456\n");
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let out = mgr.set(&names(&["ten", "seven"]), &options(true)).unwrap();
        assert_eq!(out[0].generated.as_ref().unwrap().len(), 10);
        assert_eq!(out[1].generated.as_ref().unwrap().len(), 32);
        assert!(mgr.prompter().transcript().contains("New password:"));
    }

    #[test]
    fn test_set_missing_option_before_io() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("not-yet");
        let mut mgr = LegacyPasswordManager::new(
            "production",
            Path::new("/unused"),
            Some(target.clone()),
            ScriptedPrompter::new(),
        );
        let opts = GenerationOptions {
            minimum_length: None,
            ..options(true)
        };
        let err = mgr.set(&names(&["x"]), &opts).unwrap_err();
        assert!(matches!(err, PassgenError::Configuration(_)));
        assert!(!target.exists());
    }

    #[test]
    fn test_set_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("gen_passwd");
        let mut mgr = LegacyPasswordManager::new(
            "production",
            Path::new("/unused"),
            Some(target.clone()),
            ScriptedPrompter::new(),
        );
        mgr.set(&names(&["x"]), &options(true)).unwrap();
        assert!(target.join("x").is_file());
    }

    #[test]
    fn test_remove_forced_reports_existing_files_only() {
        let dir = TempDir::new().unwrap();
        write(&dir, "db", "v\n");
        write(&dir, "db.salt", "s\n");
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let out = mgr.remove(&names(&["db"]), true).unwrap();
        assert_eq!(
            out[0].1,
            RemoveOutcome::Removed {
                files: vec![dir.path().join("db"), dir.path().join("db.salt")]
            }
        );
        let transcript = mgr.prompter().transcript();
        assert!(transcript.contains("Removed"));
        assert!(!transcript.contains(".last"));
        assert!(!dir.path().join("db").exists());
    }

    #[test]
    fn test_remove_continues_after_unlink_failure() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a", "1\n");
        write(&dir, "b", "2\n");
        fs::create_dir(dir.path().join("a.last")).unwrap();
        write(&dir, "a.last/keep", "x");
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let err = mgr.remove(&names(&["a", "b"]), true).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Failed to remove 1 of 2"), "{}", msg);
        assert!(msg.contains("'a': unable to remove"), "{}", msg);
        assert!(!msg.contains("'b'"), "{}", msg);
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join("b").exists());
        assert!(dir.path().join("a.last").exists());
    }

    #[test]
    fn test_remove_declined_keeps_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a", "1\n");
        write(&dir, "b", "2\n");
        let prompter = ScriptedPrompter::new().with_confirmations([false, true]);
        let mut mgr = manager(&dir, prompter);
        let out = mgr.remove(&names(&["a", "b"]), false).unwrap();
        assert_eq!(out[0].1, RemoveOutcome::Declined);
        assert!(dir.path().join("a").exists());
        assert!(!dir.path().join("b").exists());
    }

    #[test]
    fn test_remove_unknown_name_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a", "1\n");
        let mut mgr = manager(&dir, ScriptedPrompter::new());
        let err = mgr.remove(&names(&["a", "zzz"]), true).unwrap_err();
        assert!(matches!(err, PassgenError::Validation { .. }));
        assert!(dir.path().join("a").exists());
    }
}
