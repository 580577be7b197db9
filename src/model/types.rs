//! UI state for the playlist and track panes

use super::content::{Playlist, Track};

/// Which pane has keyboard focus
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActiveSection {
    #[default]
    Playlists,
    Tracks,
}

impl ActiveSection {
    pub fn next(self) -> Self {
        match self {
            ActiveSection::Playlists => ActiveSection::Tracks,
            ActiveSection::Tracks => ActiveSection::Playlists,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UiState {
    /// False until a session is established and again after logout
    pub logged_in: bool,
    pub active_section: ActiveSection,
    pub playlists: Vec<Playlist>,
    pub playlist_selected: usize,
    pub playlists_loading: bool,
    pub playlists_error: Option<String>,
    /// Playlist whose tracks are shown (or being fetched)
    pub open_playlist: Option<Playlist>,
    pub tracks: Vec<Track>,
    pub track_selected: usize,
    pub tracks_loading: bool,
    pub error_message: Option<String>,
}

impl UiState {
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn move_up(&mut self) {
        match self.active_section {
            ActiveSection::Playlists => {
                self.playlist_selected = self.playlist_selected.saturating_sub(1);
            }
            ActiveSection::Tracks => {
                self.track_selected = self.track_selected.saturating_sub(1);
            }
        }
    }

    pub fn move_down(&mut self) {
        match self.active_section {
            ActiveSection::Playlists => {
                if self.playlist_selected + 1 < self.playlists.len() {
                    self.playlist_selected += 1;
                }
            }
            ActiveSection::Tracks => {
                if self.track_selected + 1 < self.tracks.len() {
                    self.track_selected += 1;
                }
            }
        }
    }

    pub fn open_playlist_id(&self) -> Option<&str> {
        self.open_playlist.as_ref().map(|p| p.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackCount;

    fn playlist(id: &str) -> Playlist {
        Playlist {
            id: id.to_string(),
            uri: format!("spotify:playlist:{id}"),
            name: id.to_string(),
            description: None,
            images: Vec::new(),
            tracks: TrackCount::default(),
        }
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut ui = UiState {
            playlists: vec![playlist("a"), playlist("b")],
            ..Default::default()
        };

        ui.move_up();
        assert_eq!(ui.playlist_selected, 0);
        ui.move_down();
        ui.move_down();
        assert_eq!(ui.playlist_selected, 1);

        ui.active_section = ui.active_section.next();
        ui.move_down();
        assert_eq!(ui.track_selected, 0);
    }

    #[test]
    fn section_cycles() {
        assert_eq!(ActiveSection::Playlists.next(), ActiveSection::Tracks);
        assert_eq!(ActiveSection::Tracks.next(), ActiveSection::Playlists);
    }
}
