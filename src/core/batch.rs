//! Run one operation over a list of names, isolating per-name failures.

use crate::core::error::{PassgenError, PerNameFailure, Result};

/// How one name's operation went wrong.
#[derive(Debug)]
pub enum ItemError {
    /// Recorded against the name; the batch continues.
    Failed(String),
    /// Stops the batch immediately. Names already processed stay processed.
    Fatal(PassgenError),
}

impl ItemError {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }
}

/// Apply `op` to every name, then raise one aggregate error if any failed.
///
/// `action` and `location` only feed the aggregate error message.
pub fn run_batch<T, F>(
    action: &str,
    location: &str,
    names: &[String],
    mut op: F,
) -> Result<Vec<(String, T)>>
where
    F: FnMut(&str) -> Result<T, ItemError>,
{
    let mut done = Vec::with_capacity(names.len());
    let mut failures = Vec::new();

    for name in names {
        match op(name) {
            Ok(value) => done.push((name.clone(), value)),
            Err(ItemError::Failed(reason)) => {
                tracing::warn!(name = %name, action, "{}", reason);
                failures.push(PerNameFailure::new(name.clone(), reason));
            }
            Err(ItemError::Fatal(err)) => return Err(err),
        }
    }

    if failures.is_empty() {
        return Ok(done);
    }

    let details = failures
        .iter()
        .map(|f| format!("  '{}': {}", f.name, f.reason))
        .collect::<Vec<_>>()
        .join("\n");
    Err(PassgenError::Batch {
        action: action.to_string(),
        location: location.to_string(),
        failed: failures.len(),
        total: names.len(),
        details,
        failures,
    })
}
