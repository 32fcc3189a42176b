//! Password store reached through simplib's simpkv-backed passgen
//! functions, evaluated with `puppet apply`.

use crate::constants;
use crate::core::batch::{run_batch, ItemError};
use crate::core::error::{PassgenError, Result};
use crate::core::names::validate_names;
use crate::core::negotiator::{merge_password_options, ExistingSettings, PasswordNegotiator};
use crate::core::store::{PasswordInfo, PasswordStore, RecordDetails, RemoveOutcome, SetOutcome};
use crate::models::location::Location;
use crate::models::options::{GenerationOptions, RequiredOptions, KV_REQUIRED_KEYS, REQUIRED_KEYS};
use crate::models::record::{password_list_from_value, PasswordList};
use crate::util::password;
use crate::util::prompt::Prompter;
use crate::util::puppet::{self, ManifestRunner};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub struct PasswordManager<R: ManifestRunner, P: Prompter> {
    location: Location,
    vardir: PathBuf,
    runner: R,
    prompter: P,
    cracklib_check: Option<PathBuf>,
    password_list: Option<PasswordList>,
}

impl<R: ManifestRunner, P: Prompter> PasswordManager<R, P> {
    pub fn new(location: Location, vardir: PathBuf, runner: R, prompter: P) -> Self {
        Self {
            location,
            vardir,
            runner,
            prompter,
            cracklib_check: None,
            password_list: None,
        }
    }

    pub fn with_cracklib_check(mut self, cracklib_check: Option<PathBuf>) -> Self {
        self.cracklib_check = cracklib_check;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    fn settings_arg(&self) -> String {
        match &self.location.backend {
            Some(backend) => format!("{{ 'backend' => {} }}", puppet::quote(backend)),
            None => "{}".to_string(),
        }
    }

    pub fn list_manifest(&self) -> String {
        let folder = self.location.folder.as_deref().unwrap_or("/");
        format!(
            "$result = simplib::passgen::list({}, {})\n$yaml = to_yaml($result)\nnotice(\"\\n${{yaml}}\")\n",
            puppet::quote(folder),
            self.settings_arg()
        )
    }

    pub fn set_manifest(
        &self,
        name: &str,
        password: &str,
        salt: &str,
        complexity: u8,
        complex_only: bool,
    ) -> String {
        format!(
            "simplib::passgen::set({}, {}, {}, {}, {}, {})\n",
            puppet::quote(&self.location.fullname(name)),
            puppet::quote(password),
            puppet::quote(salt),
            complexity,
            complex_only,
            self.settings_arg()
        )
    }

    pub fn remove_manifest(&self, name: &str) -> String {
        format!(
            "simplib::passgen::remove({}, {})\n",
            puppet::quote(&self.location.fullname(name)),
            self.settings_arg()
        )
    }

    /// Listing for this location, fetched once per manager.
    pub fn password_list(&mut self) -> Result<&PasswordList> {
        if self.password_list.is_none() {
            let output = self
                .runner
                .apply(&self.list_manifest(), &self.location.environment, &self.vardir)?
                .check()?;
            let value = puppet::parse_apply_output(&output.stdout)?;
            let list = password_list_from_value(value)?;
            tracing::debug!(
                location = %self.location,
                names = list.keys.len(),
                folders = list.folders.len(),
                "fetched password list"
            );
            self.password_list = Some(list);
        }
        Ok(self.password_list.get_or_insert_with(PasswordList::default))
    }

    fn set_one(
        &mut self,
        name: &str,
        options: &GenerationOptions,
        required: &RequiredOptions,
        existing: Option<&ExistingSettings>,
    ) -> Result<SetOutcome, ItemError> {
        let existing = existing.copied().unwrap_or_default();
        let effective = merge_password_options(options, required, &existing);

        let new_password = PasswordNegotiator::new(&mut self.prompter, self.cracklib_check.as_deref())
            .negotiate(name, &effective)
            .map_err(ItemError::Fatal)?;
        let salt = password::generate_salt(constants::SALT_LENGTH);

        let manifest = self.set_manifest(
            name,
            &new_password.value,
            &salt,
            effective.complexity,
            effective.complex_only,
        );
        self.runner
            .apply(&manifest, &self.location.environment, &self.vardir)
            .and_then(|out| out.check())
            .map_err(ItemError::failed)?;

        tracing::info!(name, location = %self.location, "password set");
        self.prompter
            .say(&format!("  '{}' password set in {}", name, self.location));
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

        let manifest = self.remove_manifest(name);
        self.runner
            .apply(&manifest, &self.location.environment, &self.vardir)
            .and_then(|out| out.check())
            .map_err(ItemError::failed)?;

        tracing::info!(name, location = %self.location, "password removed");
        self.prompter
            .say(&format!("  Removed '{}' from {}", name, self.location));
        Ok(RemoveOutcome::Removed { files: Vec::new() })
    }
}

impl<R: ManifestRunner, P: Prompter> PasswordStore for PasswordManager<R, P> {
    fn location(&self) -> String {
        self.location.to_string()
    }

    fn name_list(&mut self) -> Result<Vec<String>> {
        Ok(self.password_list()?.names())
    }

    fn folder_list(&mut self) -> Result<Vec<String>> {
        Ok(self.password_list()?.folders.clone())
    }

    fn show(&mut self, names: &[String]) -> Result<Vec<PasswordInfo>> {
        let location = self.location();
        let list = self.password_list()?;
        validate_names(names, &list.names(), &location)?;

        Ok(names
            .iter()
            .filter_map(|name| list.keys.get(name).map(|record| (name, record)))
            .map(|(name, record)| PasswordInfo {
                name: name.clone(),
                current: record.password().to_string(),
                previous: record.previous_password().map(str::to_string),
                details: Some(RecordDetails {
                    complexity: record.metadata.complexity,
                    complex_only: record.metadata.complex_only,
                    history_len: record.metadata.history.len(),
                }),
            })
            .collect())
    }

    fn set(&mut self, names: &[String], options: &GenerationOptions) -> Result<Vec<SetOutcome>> {
        let required = options.require(&[REQUIRED_KEYS, KV_REQUIRED_KEYS].concat())?;

        let existing: BTreeMap<String, ExistingSettings> = self
            .password_list()?
            .keys
            .iter()
            .map(|(name, record)| {
                let settings = ExistingSettings {
                    length: Some(record.password().chars().count()),
                    complexity: record.metadata.complexity,
                    complex_only: record.metadata.complex_only,
                };
                (name.clone(), settings)
            })
            .collect();

        let location = self.location();
        let result = run_batch("set", &location, names, |name| {
            self.set_one(name, options, &required, existing.get(name))
        });
        self.password_list = None;
        Ok(result?.into_iter().map(|(_, outcome)| outcome).collect())
    }

    fn remove(&mut self, names: &[String], force: bool) -> Result<Vec<(String, RemoveOutcome)>> {
        let location = self.location();
        let valid = self.name_list()?;
        validate_names(names, &valid, &location)?;

        let result = run_batch("remove", &location, names, |name| self.remove_one(name, force));
        self.password_list = None;
        result
    }
}
