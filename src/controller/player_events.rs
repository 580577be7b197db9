//! Applying engine events and catalog responses on the UI loop

use crate::bridge::EngineLauncher;

use super::{AppController, CatalogResponse, PLAYBACK_FAILED, PLAYLISTS_FAILED};

impl<L: EngineLauncher> AppController<L> {
    /// Applies everything that arrived since the last tick.
    pub fn tick(&mut self) {
        let applied = self.bridge.drain_events();
        if applied > 0 {
            tracing::trace!(applied, "Applied engine events");
        }

        while let Ok(response) = self.responses_rx.try_recv() {
            self.apply_response(response);
        }
    }

    pub(crate) fn apply_response(&mut self, response: CatalogResponse) {
        if !self.is_logged_in() {
            tracing::debug!("Discarding catalog response after logout");
            return;
        }

        match response {
            CatalogResponse::Playlists(result) => {
                self.ui.playlists_loading = false;
                match result {
                    Ok(playlists) => {
                        tracing::info!(count = playlists.len(), "Playlists loaded");
                        self.ui.playlists = playlists;
                        self.ui.playlist_selected = 0;
                        self.ui.playlists_error = None;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Error fetching playlists");
                        self.ui.playlists_error = Some(PLAYLISTS_FAILED.to_string());
                    }
                }
            }
            CatalogResponse::Tracks {
                playlist_id,
                result,
            } => self.apply_tracks(&playlist_id, result),
            CatalogResponse::PlaybackStarted(Ok(())) => {
                tracing::info!("Playback start accepted");
            }
            CatalogResponse::PlaybackStarted(Err(e)) => {
                tracing::error!(error = %e, "Error starting playback");
                self.ui.set_error(PLAYBACK_FAILED);
            }
        }
    }
}
