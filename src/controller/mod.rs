//! Controller module - turns user intents into catalog and bridge calls
//!
//! - `input`: key event handling
//! - `navigation`: playlist and track loading
//! - `playback`: track selection and transport controls
//! - `player_events`: applying queued engine events and catalog responses
//!
//! The controller is owned by the UI loop. Catalog requests run as spawned
//! tasks and report back through a channel that the loop drains on every tick.

mod input;
mod navigation;
mod playback;
mod player_events;

use tokio::sync::mpsc;

use crate::auth::Credential;
use crate::bridge::{EngineLauncher, PlaybackSnapshot, PlayerBridge};
use crate::model::{CatalogClient, Playlist, Track, UiState};

pub const PLAYER_NOT_READY: &str = "Player not ready. Make sure you have Spotify Premium.";
pub const PLAYBACK_FAILED: &str = "Failed to start playback. Make sure you have Spotify Premium.";
pub const PLAYLISTS_FAILED: &str = "Failed to fetch playlists";
pub const TRACKS_FAILED: &str = "Failed to fetch tracks";
pub const LOGIN_FAILED: &str = "Login failed. Press l to try again.";

/// Result of a catalog request, delivered back to the UI loop.
#[derive(Debug)]
pub(crate) enum CatalogResponse {
    Playlists(Result<Vec<Playlist>, String>),
    Tracks {
        playlist_id: String,
        result: Result<Vec<Track>, String>,
    },
    PlaybackStarted(Result<(), String>),
}

/// Session changes the controller cannot make on its own; the UI loop owns
/// the session provider and carries them out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRequest {
    Login,
    Logout,
}

pub struct AppController<L: EngineLauncher> {
    pub(crate) bridge: PlayerBridge<L>,
    pub(crate) catalog: Option<CatalogClient>,
    pub(crate) ui: UiState,
    api_base: String,
    responses_tx: mpsc::UnboundedSender<CatalogResponse>,
    responses_rx: mpsc::UnboundedReceiver<CatalogResponse>,
    session_request: Option<SessionRequest>,
    should_quit: bool,
}

impl<L: EngineLauncher> AppController<L> {
    pub fn new(bridge: PlayerBridge<L>, api_base: impl Into<String>) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            bridge,
            catalog: None,
            ui: UiState::default(),
            api_base: api_base.into(),
            responses_tx,
            responses_rx,
            session_request: None,
            should_quit: false,
        }
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui
    }

    pub fn playback(&self) -> &PlaybackSnapshot {
        self.bridge.snapshot()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn is_logged_in(&self) -> bool {
        self.catalog.is_some()
    }

    /// Takes the pending login or logout request, if a key asked for one.
    pub fn take_session_request(&mut self) -> Option<SessionRequest> {
        self.session_request.take()
    }

    /// A new credential replaces the catalog client and the engine instance,
    /// then reloads the playlists.
    pub async fn on_credential(&mut self, credential: Credential) {
        if !self.install_catalog(credential.clone()) {
            return;
        }
        self.ui.logged_in = true;

        if let Err(e) = self.bridge.initialize(credential).await {
            tracing::error!(error = %e, "Could not initialize player");
            self.ui.set_error(format!("Player unavailable: {}", e));
        }

        self.load_playlists();
    }

    /// A refreshed token for the same session: the catalog client is rebuilt
    /// and the live engine reads the new token, with playback and the panes
    /// left as they are.
    pub fn on_credential_refreshed(&mut self, credential: Credential) {
        if !self.is_logged_in() {
            return;
        }
        if !self.install_catalog(credential.clone()) {
            return;
        }
        if let Err(e) = self.bridge.refresh_credential(credential) {
            tracing::warn!(error = %e, "Could not hand refreshed token to player");
        }
    }

    /// Drops the session: no catalog client, no engine, empty panes.
    pub fn on_logout(&mut self) {
        self.catalog = None;
        self.bridge.dispose();
        self.ui = UiState::default();
        tracing::info!("Session closed");
    }

    pub fn on_login_failed(&mut self) {
        self.ui.set_error(LOGIN_FAILED);
    }

    fn install_catalog(&mut self, credential: Credential) -> bool {
        match CatalogClient::with_base_url(credential, self.api_base.clone()) {
            Ok(client) => {
                self.catalog = Some(client);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not build catalog client");
                self.ui.set_error(PLAYLISTS_FAILED);
                false
            }
        }
    }

    pub(crate) fn responder(&self) -> mpsc::UnboundedSender<CatalogResponse> {
        self.responses_tx.clone()
    }
}
