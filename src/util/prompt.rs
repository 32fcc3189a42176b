//! Terminal interaction as an injectable capability.

use anyhow::Context;
use dialoguer::{Confirm, Password};
use std::collections::VecDeque;
use zeroize::Zeroizing;

/// Everything the managers need from the operator's terminal.
pub trait Prompter {
    /// Read a secret without echo.
    fn password(&mut self, prompt: &str) -> anyhow::Result<Zeroizing<String>>;

    /// Ask a yes/no question; `default` is used on a bare return.
    fn confirm(&mut self, prompt: &str, default: bool) -> anyhow::Result<bool>;

    /// Print a line of user-facing output.
    fn say(&mut self, line: &str);
}

/// Interactive prompter backed by `dialoguer` and stdout.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn password(&mut self, prompt: &str) -> anyhow::Result<Zeroizing<String>> {
        let value = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .context("read password from prompt")?;
        Ok(Zeroizing::new(value))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> anyhow::Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("read confirmation from prompt")
    }

    fn say(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Prompter that replays canned answers and records everything said.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    passwords: VecDeque<String>,
    confirmations: VecDeque<bool>,
    pub password_prompts: Vec<String>,
    pub output: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passwords<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passwords.extend(answers.into_iter().map(Into::into));
        self
    }

    pub fn with_confirmations(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirmations.extend(answers);
        self
    }

    /// All output joined with newlines.
    pub fn transcript(&self) -> String {
        self.output.join("\n")
    }
}

impl Prompter for ScriptedPrompter {
    fn password(&mut self, prompt: &str) -> anyhow::Result<Zeroizing<String>> {
        self.password_prompts.push(prompt.to_string());
        self.passwords
            .pop_front()
            .map(Zeroizing::new)
            .ok_or_else(|| anyhow::anyhow!("no scripted answer for '{}'", prompt))
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> anyhow::Result<bool> {
        self.confirmations
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted confirmation for '{}'", prompt))
    }

    fn say(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}
