//! Playlist and track loading

use crate::bridge::EngineLauncher;
use crate::model::ActiveSection;

use super::{AppController, CatalogResponse, TRACKS_FAILED};

impl<L: EngineLauncher> AppController<L> {
    pub fn load_playlists(&mut self) {
        let Some(catalog) = self.catalog.clone() else {
            return;
        };
        self.ui.playlists_loading = true;
        self.ui.playlists_error = None;

        let responder = self.responder();
        tokio::spawn(async move {
            let result = catalog.list_playlists().await.map_err(|e| e.to_string());
            let _ = responder.send(CatalogResponse::Playlists(result));
        });
    }

    /// Opens the playlist under the cursor and fetches its tracks.
    pub fn select_playlist(&mut self, index: usize) {
        let Some(playlist) = self.ui.playlists.get(index).cloned() else {
            return;
        };
        let Some(catalog) = self.catalog.clone() else {
            return;
        };

        tracing::debug!(playlist_id = %playlist.id, name = %playlist.name, "Opening playlist");
        self.ui.playlist_selected = index;
        self.ui.open_playlist = Some(playlist.clone());
        self.ui.tracks.clear();
        self.ui.track_selected = 0;
        self.ui.tracks_loading = true;
        self.ui.clear_error();

        let responder = self.responder();
        tokio::spawn(async move {
            let result = catalog.list_tracks(&playlist.id).await.map_err(|e| e.to_string());
            let _ = responder.send(CatalogResponse::Tracks {
                playlist_id: playlist.id,
                result,
            });
        });
    }

    pub(crate) fn apply_tracks(
        &mut self,
        playlist_id: &str,
        result: Result<Vec<crate::model::Track>, String>,
    ) {
        if self.ui.open_playlist_id() != Some(playlist_id) {
            tracing::debug!(playlist_id, "Discarding tracks for a playlist no longer open");
            return;
        }
        self.ui.tracks_loading = false;
        match result {
            Ok(tracks) => {
                tracing::info!(playlist_id, count = tracks.len(), "Tracks loaded");
                self.ui.tracks = tracks;
                if !self.ui.tracks.is_empty() {
                    self.ui.active_section = ActiveSection::Tracks;
                }
            }
            Err(e) => {
                tracing::error!(playlist_id, error = %e, "Error fetching tracks");
                self.ui.set_error(TRACKS_FAILED);
            }
        }
    }
}
