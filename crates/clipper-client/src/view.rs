//! Presentation seam between the job client and a UI.

use std::path::{Path, PathBuf};

/// Coarse UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Loading,
    Error,
}

/// Receives every visible change the job client makes.
///
/// Errors go through [`ProgressView::show_error`] only; a new error replaces
/// the previous one.
pub trait ProgressView: Send {
    fn state_changed(&mut self, state: UiState);

    /// Progress in percent, already clamped to 0..=100.
    fn set_progress(&mut self, percent: u8);

    fn set_status(&mut self, status: &str);

    fn show_error(&mut self, message: &str);

    fn download_saved(&mut self, _path: &Path) {}
}

/// In-memory view that records what it was told.
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    pub state: UiState,
    pub progress: u8,
    pub status: String,
    pub error: Option<String>,
    pub progress_history: Vec<u8>,
    pub status_history: Vec<String>,
    pub error_history: Vec<String>,
    pub state_history: Vec<UiState>,
    pub downloads: Vec<PathBuf>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressView for MemoryView {
    fn state_changed(&mut self, state: UiState) {
        if state == UiState::Idle {
            self.error = None;
        }
        self.state = state;
        self.state_history.push(state);
    }

    fn set_progress(&mut self, percent: u8) {
        self.progress = percent;
        self.progress_history.push(percent);
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.status_history.push(status.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.error_history.push(message.to_string());
    }

    fn download_saved(&mut self, path: &Path) {
        self.downloads.push(path.to_path_buf());
    }
}
