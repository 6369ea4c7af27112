//! # Progress Bar Module
//!
//! Questo modulo gestisce il feedback visuale durante una run della pipeline.
//!
//! ## Responsabilità:
//! - Progress bar con `indicatif` per feedback real-time
//! - Messaggi di stato per file (`[OK]` / `[COPY]` / `[ERROR]`)
//! - Spinner per le fasi indeterminate (discovery, pre-flight)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================================] 150/150 (100%) [OK] photo.jpg: 45.2% saved
//! ```

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a pipeline run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A bar that renders nothing, for `--quiet` runs and tests
    pub fn hidden(total_files: u64) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(total_files), ProgressDrawTarget::hidden()),
        }
    }

    /// Advance by one file and show a status message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}
