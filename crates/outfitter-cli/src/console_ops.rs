//! Terminal frontend for pipeline runs.
//!
//! Two pieces: a dialoguer-backed [`Operator`] for prompts, and a progress
//! renderer that prints each step as a dotted line with a colored verdict.

use std::io::{self, Write};

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Password, theme::ColorfulTheme};

use outfitter_core::prelude::*;

/// Step labels are padded with dots to this width before the verdict.
const STEP_WIDTH: usize = 25;

/// Core prompts carry their own trailing punctuation; the theme adds its
/// own, so strip ours before handing the text to dialoguer.
fn dialog_prompt(prompt: &str) -> String {
    prompt.trim().trim_end_matches(':').trim_end().to_string()
}

/// Strict parse for confirmation answers. Only a bare 'y' or 'n' counts;
/// everything else, a plain Enter included, repeats the prompt.
fn parse_acknowledgement(answer: &str) -> Option<bool> {
    match answer.trim() {
        "y" => Some(true),
        "n" => Some(false),
        _ => None,
    }
}

/// Operator backed by the terminal.
pub struct TerminalOperator {
    theme: ColorfulTheme,
}

impl TerminalOperator {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Operator for TerminalOperator {
    fn notify(&self, text: &str) {
        println!("{}", text);
    }

    fn line(&self, prompt: &str) -> Result<String> {
        Input::with_theme(&self.theme)
            .with_prompt(dialog_prompt(prompt))
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")
    }

    fn secret(&self, prompt: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(dialog_prompt(prompt))
            .interact()
            .context("Failed to read input")
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        loop {
            let answer: String = Input::with_theme(&self.theme)
                .with_prompt(format!("{} (y/n)", dialog_prompt(prompt)))
                .allow_empty(true)
                .interact_text()
                .context("Failed to read confirmation")?;
            match parse_acknowledgement(&answer) {
                Some(choice) => return Ok(choice),
                None => println!("Please only choose \"y\" or \"n\""),
            }
        }
    }

    fn pause(&self) -> Result<()> {
        let _: String = Input::with_theme(&self.theme)
            .with_prompt("Press enter when ready to proceed")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;
        Ok(())
    }
}

/// Prints pipeline progress: a banner per app, dotted step lines, a green
/// or red verdict per step.
pub struct ConsoleRenderer;

impl ProgressSink for ConsoleRenderer {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::AppStarted { name, index, total } => {
                println!();
                println!("{}", "-".repeat(40));
                println!("Starting {} - App {}/{}", name, index, total);
                println!("{}", "-".repeat(40));
            }
            PipelineEvent::StepStarted { label } => {
                let dots = STEP_WIDTH.saturating_sub(label.len());
                print!("{}{}", label, ".".repeat(dots));
                let _ = io::stdout().flush();
            }
            PipelineEvent::StepFinished { ok } => {
                if ok {
                    println!("{}", style("Success").green());
                } else {
                    println!("{}", style("Failed").red());
                }
            }
            PipelineEvent::Note { text } => {
                println!("{}", text);
            }
        }
    }
}
