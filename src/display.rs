//! Plain-text rendering of the client state for the terminal.

use crate::api::job::ClientState;
use crate::worker::UploadSnapshot;

const BAR_CELLS: usize = 12;

/// Fixed-width bar, e.g. `▓▓▓▓░░░░░░░░` for 33%.
pub fn progress_bar(percentage: u8) -> String {
    let filled = usize::from(percentage.min(100)) * BAR_CELLS / 100;
    let mut bar = "▓".repeat(filled);
    bar.push_str(&"░".repeat(BAR_CELLS - filled));
    bar
}

pub fn upload_line(upload: &UploadSnapshot) -> String {
    let tag = if upload.finished { "FINISHED" } else { "UPLOADING" };
    format!("{:<9} {:>3}%", tag, upload.percent)
}

/// One status line for the current state, or `None` when there is nothing to show.
pub fn status_line(state: &ClientState) -> Option<String> {
    if let Some(error) = &state.error {
        return Some(format!("error: {}", error));
    }
    if state.progress.percentage == 0 {
        if state.loading && state.upload.percent > 0 {
            return Some(upload_line(&state.upload));
        }
        return None;
    }
    Some(format!(
        "{:>3}% {} {}",
        state.progress.percentage,
        progress_bar(state.progress.percentage),
        state.progress.label
    ))
}
