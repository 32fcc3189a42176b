//! Kv-backend password records as returned by `simplib::passgen::list`.

use crate::core::error::{PassgenError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordValue {
    pub password: String,
    #[serde(default)]
    pub salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordMetadata {
    #[serde(default)]
    pub complexity: Option<u8>,
    #[serde(default)]
    pub complex_only: Option<bool>,
    /// Prior `[password, salt]` pairs, most recent first.
    pub history: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordRecord {
    pub value: RecordValue,
    pub metadata: RecordMetadata,
}

impl PasswordRecord {
    pub fn password(&self) -> &str {
        &self.value.password
    }

    /// Most recent prior password, if any.
    pub fn previous_password(&self) -> Option<&str> {
        self.metadata
            .history
            .first()
            .and_then(|pair| pair.first())
            .map(String::as_str)
    }
}

/// Contents of one kv folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordList {
    pub keys: BTreeMap<String, PasswordRecord>,
    pub folders: Vec<String>,
}

impl PasswordList {
    /// Sorted key names.
    pub fn names(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_mapping().and_then(|m| m.get(key))
}

/// What is structurally wrong with a listing, by key name only; empty when
/// usable. A usable listing is a `keys` mapping whose entries each carry a
/// string `value.password` and an array `metadata.history`. An empty mapping
/// is a folder with no passwords.
pub fn password_list_problems(list: &Value) -> Vec<String> {
    let Some(mapping) = list.as_mapping() else {
        return vec!["listing is not a mapping".to_string()];
    };
    if mapping.is_empty() {
        return Vec::new();
    }
    let Some(keys) = lookup(list, "keys").and_then(Value::as_mapping) else {
        return vec!["missing 'keys' mapping".to_string()];
    };
    let mut problems = Vec::new();
    for (name, entry) in keys {
        let name = name.as_str().unwrap_or("<non-string key>");
        let password_ok = lookup(entry, "value")
            .and_then(|v| lookup(v, "password"))
            .is_some_and(Value::is_string);
        if !password_ok {
            problems.push(format!("'{}' lacks a string value.password", name));
        }
        let history_ok = lookup(entry, "metadata")
            .and_then(|m| lookup(m, "history"))
            .is_some_and(Value::is_sequence);
        if !history_ok {
            problems.push(format!("'{}' lacks a metadata.history array", name));
        }
    }
    problems
}

pub fn is_valid_password_list(list: &Value) -> bool {
    password_list_problems(list).is_empty()
}

/// Validate and convert a decoded listing into typed records.
///
/// Errors name the offending keys but never carry stored values.
pub fn password_list_from_value(list: Value) -> Result<PasswordList> {
    let problems = password_list_problems(&list);
    if !problems.is_empty() {
        return Err(PassgenError::parse(
            "simplib::passgen::list result",
            problems.join("; "),
        ));
    }

    let mut out = PasswordList::default();
    if let Some(keys) = lookup(&list, "keys").and_then(Value::as_mapping) {
        for (name, entry) in keys {
            let name = match name {
                Value::String(s) => s.clone(),
                other => serde_yaml::to_string(other)
                    .map(|s| s.trim().to_string())
                    .map_err(|e| PassgenError::parse("password name", e.to_string()))?,
            };
            let record: PasswordRecord = serde_yaml::from_value(entry.clone())
                .map_err(|e| PassgenError::parse(format!("record '{}'", name), e.to_string()))?;
            out.keys.insert(name, record);
        }
    }
    if let Some(folders) = lookup(&list, "folders").and_then(Value::as_sequence) {
        out.folders = folders
            .iter()
            .filter_map(|f| f.as_str().map(str::to_string))
            .collect();
        out.folders.sort();
    }
    Ok(out)
}
