//! Password generation and strength validation primitives.

use rand::{rngs::OsRng, seq::SliceRandom, Rng};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SAFE_SYMBOLS: &str = "@%-_+=~";
const ALL_SYMBOLS: &str = "!@#$%^&*()-_=+[]{}|;:,.<>?/~";

fn character_classes(complexity: u8, complex_only: bool) -> Vec<Vec<char>> {
    let symbols = match complexity {
        0 => None,
        1 => Some(SAFE_SYMBOLS),
        _ => Some(ALL_SYMBOLS),
    };
    match (symbols, complex_only) {
        (Some(symbols), true) => vec![symbols.chars().collect()],
        (Some(symbols), false) => vec![
            LOWER.chars().collect(),
            UPPER.chars().collect(),
            DIGITS.chars().collect(),
            symbols.chars().collect(),
        ],
        (None, _) => vec![
            LOWER.chars().collect(),
            UPPER.chars().collect(),
            DIGITS.chars().collect(),
        ],
    }
}

/// Generate a random password.
///
/// Complexity 0 is alphanumeric, 1 adds a small symbol set, 2 adds the full
/// symbol set. `complex_only` restricts output to symbols and is ignored at
/// complexity 0. Every character class appears at least once when `length`
/// allows it.
pub fn generate_password(length: usize, complexity: u8, complex_only: bool) -> String {
    if length == 0 {
        return String::new();
    }
    let classes = character_classes(complexity, complex_only);
    let pool: Vec<char> = classes.iter().flatten().copied().collect();
    let mut rng = OsRng;

    let mut chars: Vec<char> = Vec::with_capacity(length);
    if length >= classes.len() {
        for class in &classes {
            chars.push(class[rng.gen_range(0..class.len())]);
        }
    }
    while chars.len() < length {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);
    chars.into_iter().collect()
}

/// Generate a kv-backend salt.
pub fn generate_salt(length: usize) -> String {
    generate_password(length, 0, false)
}

/// Check an operator-supplied password. Returns the rejection reason.
pub fn validate_password(
    password: &str,
    minimum_length: usize,
    cracklib_check: Option<&Path>,
) -> Result<(), String> {
    if password.is_empty() {
        return Err("password cannot be empty".into());
    }
    if password.chars().any(char::is_whitespace) {
        return Err("password cannot contain whitespace".into());
    }
    let length = password.chars().count();
    if length < minimum_length {
        return Err(format!(
            "password must be at least {} characters long (got {})",
            minimum_length, length
        ));
    }
    match cracklib_check {
        Some(checker) if checker.exists() => run_cracklib(checker, password),
        _ => Ok(()),
    }
}

fn run_cracklib(checker: &Path, password: &str) -> Result<(), String> {
    let mut child = Command::new(checker)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("unable to run {}: {}", checker.display(), e))?;
    if let Some(mut stdin) = child.stdin.take() {
        writeln!(stdin, "{}", password)
            .map_err(|e| format!("unable to write to {}: {}", checker.display(), e))?;
    }
    let output = child
        .wait_with_output()
        .map_err(|e| format!("unable to run {}: {}", checker.display(), e))?;
    // cracklib-check echoes "<password>: <verdict>"
    let stdout = String::from_utf8_lossy(&output.stdout);
    let verdict = stdout
        .trim_end()
        .rsplit_once(": ")
        .map(|(_, verdict)| verdict.to_string())
        .unwrap_or_default();
    if verdict == "OK" {
        Ok(())
    } else if verdict.is_empty() {
        Err("password rejected by strength check".into())
    } else {
        Err(format!("password rejected: {}", verdict))
    }
}
