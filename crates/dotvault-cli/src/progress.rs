//! Progress tracking for the CLI

use console::style;
use dotvault_types::ProgressEvent;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar fed from engine progress events
///
/// Clones share the same bar, so one clone can move to the worker thread
/// while another prints warnings from the main task.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a tracker, drawing nothing when `enabled` is false
    pub fn new(enabled: bool) -> Self {
        let progress_bar = enabled.then(|| {
            let pb = ProgressBar::new(0);
            let bar_style = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{wide_bar:.cyan/blue}] {pos}/{len}")
                .map_or_else(
                    |_| ProgressStyle::default_bar(),
                    |s| s.progress_chars("█▉▊▋▌▍▎▏  "),
                );
            pb.set_style(bar_style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        Self { progress_bar }
    }

    /// Reflect one engine event
    ///
    /// Bytes drive the bar when the total is known, files otherwise.
    pub fn update(&self, event: &ProgressEvent) {
        let Some(pb) = &self.progress_bar else {
            return;
        };

        if event.total_bytes > 0 {
            pb.set_length(event.total_bytes);
            pb.set_position(event.bytes_processed.min(event.total_bytes));
        } else if event.total_files > 0 {
            pb.set_length(event.total_files);
            pb.set_position(event.files_processed);
        } else {
            pb.set_length(event.files_processed);
            pb.set_position(event.files_processed);
        }

        let filename = event
            .current_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        pb.set_message(format!("{}: {}", event.status, filename));
    }

    /// Set a message without updating progress
    pub fn set_message(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Run `f` with the bar hidden
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        match &self.progress_bar {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }

    /// Display a warning during progress
    pub fn display_warning(&self, message: &str) {
        self.suspend(|| {
            eprintln!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
        });
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_and_clear();
        }
    }
}
