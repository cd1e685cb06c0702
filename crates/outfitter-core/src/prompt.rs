//! Operator interaction seam.
//!
//! Pipelines never talk to a terminal directly; they go through [`Operator`]
//! so the CLI can put a real prompt behind it and tests can script one.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, bail};

/// Blocking interaction channel with whoever is driving the run.
pub trait Operator: Send + Sync {
    /// Print a line of output.
    fn notify(&self, text: &str);

    /// Ask for a line of input.
    fn line(&self, prompt: &str) -> Result<String>;

    /// Ask for a line of input without echoing it.
    fn secret(&self, prompt: &str) -> Result<String>;

    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Wait until the operator is ready to continue.
    fn pause(&self) -> Result<()>;
}

/// Present a numbered list and loop until the operator picks a valid entry.
///
/// Returns the zero-based index of the selection. Entries are shown
/// one-based, matching what the operator types.
pub fn select_numbered(operator: &dyn Operator, prompt: &str, items: &[String]) -> Result<usize> {
    operator.notify(prompt);
    for (position, item) in items.iter().enumerate() {
        operator.notify(&format!("    {}. {}", position + 1, item));
    }
    loop {
        let answer = operator.line("Selection: ")?;
        match answer.trim().parse::<usize>() {
            Ok(choice) if (1..=items.len()).contains(&choice) => return Ok(choice - 1),
            Ok(_) => operator.notify(&format!(
                "Please select a valid option between 1 and {}",
                items.len()
            )),
            Err(_) => operator.notify("Please enter a number."),
        }
    }
}

/// Operator that replays pre-seeded answers, for non-interactive runs.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    lines: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    confirms: Mutex<VecDeque<bool>>,
    notices: Mutex<Vec<String>>,
    pauses: Mutex<usize>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed answers for [`Operator::line`] prompts, consumed in order.
    pub fn with_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .lock()
            .unwrap()
            .extend(lines.into_iter().map(Into::into));
        self
    }

    /// Seed answers for [`Operator::secret`] prompts, consumed in order.
    pub fn with_secrets<I, S>(self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secrets
            .lock()
            .unwrap()
            .extend(secrets.into_iter().map(Into::into));
        self
    }

    /// Seed answers for [`Operator::confirm`] prompts, consumed in order.
    pub fn with_confirms<I>(self, confirms: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        self.confirms.lock().unwrap().extend(confirms);
        self
    }

    /// Everything printed through [`Operator::notify`] so far.
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    /// How many times [`Operator::pause`] was hit.
    pub fn pause_count(&self) -> usize {
        *self.pauses.lock().unwrap()
    }
}

impl Operator for ScriptedOperator {
    fn notify(&self, text: &str) {
        self.notices.lock().unwrap().push(text.to_string());
    }

    fn line(&self, prompt: &str) -> Result<String> {
        match self.lines.lock().unwrap().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("no scripted answer left for prompt: {}", prompt),
        }
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        match self.secrets.lock().unwrap().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("no scripted secret left for prompt: {}", prompt),
        }
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        match self.confirms.lock().unwrap().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("no scripted confirmation left for prompt: {}", prompt),
        }
    }

    fn pause(&self) -> Result<()> {
        *self.pauses.lock().unwrap() += 1;
        Ok(())
    }
}
