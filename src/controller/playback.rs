//! Track selection and transport controls

use crate::bridge::EngineLauncher;
use crate::model::PlaybackTarget;

use super::{AppController, CatalogResponse, PLAYER_NOT_READY};

const SEEK_STEP_MS: u32 = 10_000;

impl<L: EngineLauncher> AppController<L> {
    /// Plays the open playlist's tracks starting at `index` on this device.
    pub fn select_track(&mut self, index: usize) {
        let snapshot = self.bridge.snapshot();
        if !snapshot.ready || snapshot.device_id.is_empty() {
            tracing::warn!("Track selected before the player was ready");
            self.ui.set_error(PLAYER_NOT_READY);
            return;
        }
        let Some(catalog) = self.catalog.clone() else {
            return;
        };
        if index >= self.ui.tracks.len() {
            return;
        }

        let uris: Vec<String> = self.ui.tracks[index..]
            .iter()
            .map(|t| t.uri.clone())
            .collect();
        let device_id = snapshot.device_id.clone();
        self.ui.track_selected = index;

        tracing::info!(device_id = %device_id, index, queued = uris.len(), "Starting playback");
        let responder = self.responder();
        tokio::spawn(async move {
            let result = catalog
                .start_playback(&device_id, &PlaybackTarget::Tracks(uris))
                .await
                .map_err(|e| e.to_string());
            let _ = responder.send(CatalogResponse::PlaybackStarted(result));
        });
    }

    pub fn toggle_playback(&self) {
        tracing::debug!(playing = self.bridge.snapshot().playing, "Toggling playback");
        self.bridge.toggle_play();
    }

    pub fn next_track(&self) {
        self.bridge.next_track();
    }

    pub fn previous_track(&self) {
        self.bridge.previous_track();
    }

    pub fn seek_forward(&self) {
        let snapshot = self.bridge.snapshot();
        if snapshot.duration_ms == 0 {
            return;
        }
        let target = snapshot
            .position_ms
            .saturating_add(SEEK_STEP_MS)
            .min(snapshot.duration_ms);
        self.bridge.seek(target);
    }

    pub fn seek_backward(&self) {
        let snapshot = self.bridge.snapshot();
        if snapshot.duration_ms == 0 {
            return;
        }
        self.bridge.seek(snapshot.position_ms.saturating_sub(SEEK_STEP_MS));
    }
}
