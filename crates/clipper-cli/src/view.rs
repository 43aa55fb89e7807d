use std::path::Path;
use std::time::Duration;

use clipper_client::{ProgressView, UiState};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar plus status line on the terminal.
pub struct TerminalView {
    pb: ProgressBar,
    last_error: Option<String>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(100))
    }

    /// A view that draws nothing.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(pb: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}",
        ) {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_length(100);
        Self {
            pb,
            last_error: None,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    pub fn message(&self) -> String {
        self.pb.message()
    }

    pub fn finish(&self, message: &str) {
        self.pb.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.pb.abandon_with_message(message.to_string());
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressView for TerminalView {
    fn state_changed(&mut self, state: UiState) {
        match state {
            UiState::Loading => self.pb.enable_steady_tick(Duration::from_millis(100)),
            UiState::Idle => self.last_error = None,
            UiState::Error => self.pb.disable_steady_tick(),
        }
    }

    fn set_progress(&mut self, percent: u8) {
        self.pb.set_position(u64::from(percent));
    }

    fn set_status(&mut self, status: &str) {
        self.pb.set_message(status.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.pb.println(format!("error: {}", message));
    }

    fn download_saved(&mut self, path: &Path) {
        self.pb.println(format!(":: Saved clip to {}", path.display()));
    }
}
