//! Resolution of generation settings and acquisition of new passwords.

use crate::constants;
use crate::core::error::{PassgenError, Result};
use crate::models::options::{EffectiveOptions, GenerationOptions, RequiredOptions};
use crate::util::password;
use crate::util::prompt::Prompter;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Settings recoverable from what is already stored for a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExistingSettings {
    pub length: Option<usize>,
    pub complexity: Option<u8>,
    pub complex_only: Option<bool>,
}

/// Pick the password length.
///
/// An explicit request wins unless it is shorter than `minimum`; otherwise an
/// existing length of at least `minimum` is kept. Anything too short falls
/// back to `default`, never to the short value.
pub fn resolve_length(
    requested: Option<usize>,
    existing: Option<usize>,
    default: usize,
    minimum: usize,
) -> usize {
    match requested {
        Some(length) if length < minimum => default,
        Some(length) => length,
        None => match existing {
            Some(length) if length >= minimum => length,
            _ => default,
        },
    }
}

/// Merge requested options, stored settings and defaults into the settings
/// for one name. Inputs are left untouched.
pub fn merge_password_options(
    options: &GenerationOptions,
    required: &RequiredOptions,
    existing: &ExistingSettings,
) -> EffectiveOptions {
    EffectiveOptions {
        auto_gen: required.auto_gen,
        force_value: required.force_value,
        length: resolve_length(
            options.length,
            existing.length,
            required.default_length,
            required.minimum_length,
        ),
        minimum_length: required.minimum_length,
        complexity: options
            .complexity
            .or(existing.complexity)
            .or(options.default_complexity)
            .unwrap_or(constants::DEFAULT_COMPLEXITY),
        complex_only: options
            .complex_only
            .or(existing.complex_only)
            .or(options.default_complex_only)
            .unwrap_or(false),
    }
}

/// A freshly obtained password.
#[derive(Debug)]
pub struct NewPassword {
    pub value: Zeroizing<String>,
    pub generated: bool,
}

/// Obtains a password either from the generator or from the operator.
pub struct PasswordNegotiator<'p> {
    prompter: &'p mut dyn Prompter,
    cracklib_check: Option<PathBuf>,
    max_attempts: u32,
}

impl<'p> PasswordNegotiator<'p> {
    pub fn new(prompter: &'p mut dyn Prompter, cracklib_check: Option<&Path>) -> Self {
        Self {
            prompter,
            cracklib_check: cracklib_check.map(Path::to_path_buf),
            max_attempts: constants::MAX_PASSWORD_ATTEMPTS,
        }
    }

    pub fn negotiate(&mut self, name: &str, options: &EffectiveOptions) -> Result<NewPassword> {
        if options.auto_gen {
            return Ok(NewPassword {
                value: Zeroizing::new(password::generate_password(
                    options.length,
                    options.complexity,
                    options.complex_only,
                )),
                generated: true,
            });
        }

        for attempt in 1..=self.max_attempts {
            let entered = self.enter(name, options)?;
            let confirmed = self.ask(&format!("Confirm password for '{}'", name))?;
            if entered == confirmed {
                return Ok(NewPassword {
                    value: entered,
                    generated: false,
                });
            }
            tracing::debug!(name, attempt, "password confirmation mismatch");
            self.prompter.say("  Passwords do not match! Please try again.");
        }
        Err(PassgenError::PromptExhaustion(name.to_string()))
    }

    // Re-asks until the answer validates; mismatches are counted by the caller.
    fn enter(&mut self, name: &str, options: &EffectiveOptions) -> Result<Zeroizing<String>> {
        loop {
            let value = self.ask(&format!("Enter password for '{}'", name))?;
            if options.force_value {
                return Ok(value);
            }
            match password::validate_password(
                &value,
                options.minimum_length,
                self.cracklib_check.as_deref(),
            ) {
                Ok(()) => return Ok(value),
                Err(reason) => self.prompter.say(&format!("  Invalid password: {}", reason)),
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        self.prompter
            .password(prompt)
            .map_err(|e| PassgenError::Prompt(format!("{:#}", e)))
    }
}
