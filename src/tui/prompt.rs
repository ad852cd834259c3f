//! Line input

use crossterm::style::{Color, Stylize};
use std::io::{self, BufRead, Write};

/// Reads lines from stdin behind a coloured prompt, remembering what was typed
#[derive(Default)]
pub struct PromptHandler {
    history: Vec<String>,
}

impl PromptHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `symbol` and read one line. `None` on EOF (Ctrl+D).
    pub fn read_line(&mut self, symbol: &str, color: Color) -> Option<String> {
        print!("{} ", symbol.with(color));
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    self.history.push(trimmed.clone());
                }
                Some(trimmed)
            }
            Err(_) => None,
        }
    }

    /// Ask for a single value, e.g. a username. Not recorded in history.
    pub fn ask(&self, label: &str, color: Color) -> Option<String> {
        print!("{} ", format!("{}:", label).with(color));
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}
