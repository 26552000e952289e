//! Progress indicators for long-running graph queries

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner on stderr for an indeterminate operation. Hidden when `quiet`;
/// indicatif also hides it when stderr is not a terminal.
pub fn create_spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
