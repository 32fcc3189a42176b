//! Password generation options as requested by the caller and as resolved
//! for one name.

use crate::core::error::{PassgenError, Result};
use crate::models::config::GenerationSection;

/// Caller-supplied generation options.
///
/// Every field is optional so that the record can be assembled from
/// configuration and command-line flags; [`GenerationOptions::require`]
/// enforces the keys a backend needs before any work starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    pub auto_gen: Option<bool>,
    /// Accept entered passwords without strength validation.
    pub force_value: Option<bool>,
    pub default_length: Option<usize>,
    pub minimum_length: Option<usize>,
    pub length: Option<usize>,
    pub complexity: Option<u8>,
    pub complex_only: Option<bool>,
    pub default_complexity: Option<u8>,
    pub default_complex_only: Option<bool>,
}

/// Keys both backends need.
pub const REQUIRED_KEYS: &[&str] = &["auto_gen", "force_value", "default_length", "minimum_length"];

/// Additional keys the kv backend needs.
pub const KV_REQUIRED_KEYS: &[&str] = &["default_complexity", "default_complex_only"];

impl GenerationOptions {
    /// Build options from the configured defaults plus per-invocation flags.
    pub fn from_config(section: &GenerationSection) -> Self {
        Self {
            auto_gen: Some(false),
            force_value: Some(false),
            default_length: Some(section.default_length),
            minimum_length: Some(section.minimum_length),
            length: None,
            complexity: None,
            complex_only: None,
            default_complexity: Some(section.default_complexity),
            default_complex_only: Some(section.default_complex_only),
        }
    }

    fn is_present(&self, key: &str) -> bool {
        match key {
            "auto_gen" => self.auto_gen.is_some(),
            "force_value" => self.force_value.is_some(),
            "default_length" => self.default_length.is_some(),
            "minimum_length" => self.minimum_length.is_some(),
            "length" => self.length.is_some(),
            "complexity" => self.complexity.is_some(),
            "complex_only" => self.complex_only.is_some(),
            "default_complexity" => self.default_complexity.is_some(),
            "default_complex_only" => self.default_complex_only.is_some(),
            _ => false,
        }
    }

    /// Fail with a configuration error naming every missing key.
    pub fn require(&self, keys: &[&str]) -> Result<RequiredOptions> {
        let missing: Vec<&str> = keys.iter().copied().filter(|k| !self.is_present(k)).collect();
        if !missing.is_empty() {
            return Err(PassgenError::Configuration(format!(
                "missing password generation option(s): {}",
                missing.join(", ")
            )));
        }
        match (self.auto_gen, self.force_value, self.default_length, self.minimum_length) {
            (Some(auto_gen), Some(force_value), Some(default_length), Some(minimum_length)) => {
                Ok(RequiredOptions {
                    auto_gen,
                    force_value,
                    default_length,
                    minimum_length,
                })
            }
            _ => Err(PassgenError::Configuration(format!(
                "missing password generation option(s): {}",
                REQUIRED_KEYS.join(", ")
            ))),
        }
    }
}

/// The required subset of [`GenerationOptions`], once checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredOptions {
    pub auto_gen: bool,
    pub force_value: bool,
    pub default_length: usize,
    pub minimum_length: usize,
}

/// Settings actually used to produce one password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveOptions {
    pub auto_gen: bool,
    pub force_value: bool,
    pub length: usize,
    pub minimum_length: usize,
    pub complexity: u8,
    pub complex_only: bool,
}
