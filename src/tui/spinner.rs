//! Progress indicators

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICKS: &[&str] = &[
    "\u{2800}", "\u{2801}", "\u{2803}", "\u{2807}", "\u{280f}", "\u{281f}", "\u{283f}",
    "\u{287f}", "\u{28ff}", "\u{28fe}", "\u{28fc}", "\u{28f8}", "\u{28f0}", "\u{28e0}",
    "\u{28c0}", "\u{2880}", "\u{2800}",
];

/// Shown while waiting for the first fragment of an answer
pub struct ThinkingSpinner {
    bar: ProgressBar,
    active: bool,
}

impl Default for ThinkingSpinner {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkingSpinner {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
            bar.set_style(style.tick_strings(TICKS));
        }
        Self { bar, active: false }
    }

    pub fn start(&mut self, msg: &str) {
        self.bar.set_message(msg.to_string());
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.active = true;
    }

    /// Stop and clear the spinner
    pub fn stop(&mut self) {
        if self.active {
            self.bar.finish_and_clear();
            self.active = false;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for ThinkingSpinner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Percent bar for file uploads
#[derive(Clone)]
pub struct UploadProgress {
    bar: ProgressBar,
}

impl UploadProgress {
    pub fn new(filename: &str) -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) =
            ProgressStyle::with_template("  {msg} [{bar:30.cyan/blue}] {pos:>3}%")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(filename.to_string());
        Self { bar }
    }

    pub fn set(&self, percent: u8) {
        self.bar.set_position(u64::from(percent.min(100)));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_progress_clamps() {
        let progress = UploadProgress::new("a.pdf");
        progress.set(40);
        assert_eq!(progress.position(), 40);
        progress.set(250);
        assert_eq!(progress.position(), 100);
        progress.finish();
    }

    #[test]
    fn test_spinner_stop_is_idempotent() {
        let mut spinner = ThinkingSpinner::new();
        assert!(!spinner.is_active());
        spinner.start("thinking");
        assert!(spinner.is_active());
        spinner.stop();
        spinner.stop();
        assert!(!spinner.is_active());
    }
}
