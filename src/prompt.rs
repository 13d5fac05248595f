//! Interactive questions for the command line.
//! The CLI asks through a [`Prompter`] so commands can run unattended.

use crate::error::Result;
use dialoguer::{Confirm, Input};

/// Asks the user for values.
pub trait Prompter {
    /// Asks for a line of text, offering `default`.
    fn input(&self, prompt: &str, default: &str) -> Result<String>;

    /// Asks a yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Prompts on the terminal through `dialoguer`.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn input(&self, prompt: &str, default: &str) -> Result<String> {
        let value = Input::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()?;
        Ok(value)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(default).interact()?)
    }
}

/// Answers every question with its default, for `--yes` and scripted runs.
#[derive(Debug, Default)]
pub struct DefaultPrompter;

impl Prompter for DefaultPrompter {
    fn input(&self, _prompt: &str, default: &str) -> Result<String> {
        Ok(default.to_string())
    }

    fn confirm(&self, _prompt: &str, default: bool) -> Result<bool> {
        Ok(default)
    }
}

/// Returns the prompter matching the `--yes` flag.
pub fn get_prompter(assume_yes: bool) -> Box<dyn Prompter> {
    if assume_yes {
        Box::new(DefaultPrompter)
    } else {
        Box::new(DialoguerPrompter::new())
    }
}
