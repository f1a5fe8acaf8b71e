//! Progress bar for decompression.

use indicatif::{ProgressBar, ProgressStyle};

/// Resolution of the bar: tenths of a percent.
const STEPS: u64 = 1000;

/// Percentage-driven progress display
pub struct PercentBar {
    bar: ProgressBar,
}

impl PercentBar {
    /// Creates a new progress bar labelled with `message`
    pub fn new(message: &str, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(STEPS);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb.set_message(message.to_string());
            pb
        };
        Self { bar }
    }

    /// Moves the bar to `percent` (0 to 100)
    pub fn set(&self, percent: f64) {
        let pos = (percent.clamp(0.0, 100.0) * STEPS as f64 / 100.0).round() as u64;
        self.bar.set_position(pos);
    }

    /// Finishes the progress bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Leaves the bar where it stopped with a failure message
    pub fn abandon(&self) {
        self.bar.abandon_with_message("Failed");
    }
}
