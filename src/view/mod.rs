//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//!
//! - `utils`: shared formatting helpers
//! - `layout`: status bar, playlist pane, track pane
//! - `progress`: now-playing bar
//! - `overlays`: error notification

mod utils;
mod layout;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::bridge::PlaybackSnapshot;
use crate::model::UiState;

pub use utils::format_time;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackSnapshot, ui_state: &UiState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Player status
                Constraint::Min(0),    // Playlists + tracks
                Constraint::Length(3), // Now playing
            ])
            .split(frame.area());

        layout::render_status_bar(frame, chunks[0], ui_state, playback);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(chunks[1]);

        layout::render_playlists(frame, main_chunks[0], ui_state);
        layout::render_tracks(frame, main_chunks[1], ui_state, playback);

        progress::render_progress_bar(frame, chunks[2], playback);

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }
    }
}
