//! librespot-backed playback engine
//!
//! [`LibrespotLauncher`] loads the audio sink and mixer once; every
//! [`LibrespotEngine`] then runs its own librespot session, player and
//! Connect device on a driver task that owns them. Commands reach the
//! driver through a channel, and what librespot reports comes back as
//! [`EngineEvent`]s.

use std::future::Future;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use librespot::connect::{ConnectConfig, Spirc};
use librespot::core::authentication::Credentials;
use librespot::core::cache::Cache;
use librespot::core::config::SessionConfig;
use librespot::core::error::ErrorKind;
use librespot::core::session::Session;
use librespot::metadata::audio::{AudioItem, UniqueFields};
use librespot::playback::audio_backend::{self, SinkBuilder};
use librespot::playback::config::{AudioFormat, Bitrate, PlayerConfig};
use librespot::playback::mixer::{self, MixerConfig, MixerFn};
use librespot::playback::player::{Player, PlayerEvent};
use tokio::sync::{OnceCell, mpsc};

use crate::bridge::{
    BridgeError, EngineEvent, EngineLauncher, EngineOptions, EventSink, PlaybackEngine,
    PlayerState,
};
use crate::model::{Album, Artist, Image, Track};

const DEVICE_NAME_PREFIX: &str = "spotify-web-player";

/// Audio output pieces shared by every engine instance.
#[derive(Clone)]
struct EngineRuntime {
    sink_builder: SinkBuilder,
    mixer_builder: MixerFn,
    cache: Option<Cache>,
}

impl EngineRuntime {
    fn load(cache_dir: &Path) -> Result<Self, BridgeError> {
        let sink_builder = audio_backend::find(None)
            .ok_or_else(|| BridgeError::EngineUnavailable("no audio backend".into()))?;
        let mixer_builder = mixer::find(None)
            .ok_or_else(|| BridgeError::EngineUnavailable("no mixer".into()))?;

        let files = cache_dir.join("files");
        let cache = match Cache::new(
            Some(cache_dir),
            Some(cache_dir),
            Some(files.as_path()),
            None,
        ) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Audio cache unavailable, continuing without it");
                None
            }
        };

        Ok(Self {
            sink_builder,
            mixer_builder,
            cache,
        })
    }
}

pub struct LibrespotLauncher {
    cache_dir: PathBuf,
    device_id: String,
    runtime: OnceCell<EngineRuntime>,
}

impl LibrespotLauncher {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            device_id: Self::get_device_id(),
            runtime: OnceCell::new(),
        }
    }

    fn get_device_id() -> String {
        // Stable per machine so the account sees one device, not one per run
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}-{}", DEVICE_NAME_PREFIX, hostname)
    }
}

#[async_trait]
impl EngineLauncher for LibrespotLauncher {
    type Engine = LibrespotEngine;

    async fn ensure_loaded(&self) -> Result<(), BridgeError> {
        self.runtime
            .get_or_try_init(|| async {
                tracing::info!(cache_dir = %self.cache_dir.display(), "Loading audio runtime");
                EngineRuntime::load(&self.cache_dir)
            })
            .await
            .map(|_| ())
    }

    fn create(&self, options: EngineOptions, events: EventSink) -> LibrespotEngine {
        LibrespotEngine {
            options,
            events,
            device_id: self.device_id.clone(),
            runtime: self.runtime.get().cloned(),
            commands: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    TogglePlay,
    Next,
    Previous,
    Seek(u32),
    Disconnect,
}

pub struct LibrespotEngine {
    options: EngineOptions,
    events: EventSink,
    device_id: String,
    runtime: Option<EngineRuntime>,
    commands: Option<mpsc::UnboundedSender<Command>>,
}

impl LibrespotEngine {
    fn send(&self, command: Command) {
        match &self.commands {
            Some(tx) => {
                if tx.send(command).is_err() {
                    tracing::debug!(?command, "Engine driver stopped, command dropped");
                }
            }
            None => tracing::debug!(?command, "Engine not connected, command dropped"),
        }
    }
}

impl PlaybackEngine for LibrespotEngine {
    fn connect(&mut self) {
        if self.commands.is_some() {
            return;
        }
        let Some(runtime) = self.runtime.clone() else {
            self.events.emit(EngineEvent::InitializationError {
                message: "audio runtime not loaded".to_string(),
            });
            return;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        self.commands = Some(tx);
        tokio::spawn(drive(
            self.options.clone(),
            self.events.clone(),
            self.device_id.clone(),
            runtime,
            rx,
        ));
    }

    fn disconnect(&mut self) {
        self.send(Command::Disconnect);
        self.commands = None;
    }

    fn toggle_play(&self) {
        self.send(Command::TogglePlay);
    }

    fn next_track(&self) {
        self.send(Command::Next);
    }

    fn previous_track(&self) {
        self.send(Command::Previous);
    }

    fn seek(&self, position_ms: u32) {
        self.send(Command::Seek(position_ms));
    }
}

fn volume_to_mixer(volume: f32) -> u16 {
    (volume.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16
}

fn classify_error(error: &librespot::core::Error) -> EngineEvent {
    let message = error.to_string();
    match error.kind {
        ErrorKind::Unauthenticated => EngineEvent::AuthenticationError { message },
        ErrorKind::PermissionDenied => EngineEvent::AccountError { message },
        _ => EngineEvent::InitializationError { message },
    }
}

/// Waits for `connecting` unless a disconnect is queued or arrives first.
/// Other commands sent before the session is up are dropped.
async fn connect_unless_disconnected<F: Future>(
    connecting: F,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> Option<F::Output> {
    tokio::pin!(connecting);
    loop {
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(Command::Disconnect) | None => return None,
                Some(command) => {
                    tracing::debug!(?command, "Engine still connecting, command dropped");
                }
            },
            output = &mut connecting => return Some(output),
        }
    }
}

/// Owns one librespot session for its whole life.
async fn drive(
    options: EngineOptions,
    events: EventSink,
    device_id: String,
    runtime: EngineRuntime,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let session_config = SessionConfig {
        device_id: device_id.clone(),
        ..Default::default()
    };
    let player_config = PlayerConfig {
        bitrate: Bitrate::Bitrate320,
        ..Default::default()
    };
    let connect_config = ConnectConfig {
        name: options.name.clone(),
        ..Default::default()
    };

    let mixer = match (runtime.mixer_builder)(MixerConfig::default()) {
        Ok(mixer) => mixer,
        Err(e) => {
            events.emit(EngineEvent::InitializationError {
                message: e.to_string(),
            });
            return;
        }
    };
    mixer.set_volume(volume_to_mixer(options.volume));

    let session = Session::new(session_config, runtime.cache.clone());
    let sink_builder = runtime.sink_builder;
    let audio_format = AudioFormat::default();
    let player = Player::new(
        player_config,
        session.clone(),
        mixer.get_soft_volume(),
        move || sink_builder(None, audio_format),
    );
    let mut player_events = player.get_player_event_channel();

    let credential = (options.token_provider)();
    let credentials = Credentials::with_access_token(credential.secret());

    tracing::info!(name = %options.name, "Connecting librespot");
    let connecting = Spirc::new(
        connect_config,
        session.clone(),
        credentials,
        player.clone(),
        mixer,
    );
    let (spirc, spirc_task) = match connect_unless_disconnected(connecting, &mut commands).await {
        Some(Ok(pair)) => pair,
        Some(Err(e)) => {
            tracing::error!(error = %e, "librespot connect failed");
            events.emit(classify_error(&e));
            return;
        }
        None => {
            tracing::info!(name = %options.name, "Disconnected before connect completed");
            session.shutdown();
            return;
        }
    };

    let ready_id = session.device_id().to_string();
    events.emit(EngineEvent::Ready {
        device_id: ready_id.clone(),
    });

    tokio::pin!(spirc_task);
    let mut tracker = StateTracker::default();
    let mut shutting_down = false;

    loop {
        tokio::select! {
            _ = &mut spirc_task => {
                tracing::info!(device_id = %ready_id, "librespot Connect task ended");
                events.emit(EngineEvent::NotReady { device_id: ready_id.clone() });
                break;
            }
            Some(command) = commands.recv(), if !shutting_down => {
                let result = match command {
                    Command::TogglePlay => spirc.play_pause(),
                    Command::Next => spirc.next(),
                    Command::Previous => spirc.prev(),
                    Command::Seek(position_ms) => spirc.set_position_ms(position_ms),
                    Command::Disconnect => {
                        shutting_down = true;
                        spirc.shutdown()
                    }
                };
                if let Err(e) = result {
                    tracing::warn!(?command, error = %e, "librespot command failed");
                }
            }
            event = player_events.recv() => match event {
                Some(event) => {
                    if let Some(update) = PlaybackUpdate::from_player_event(event) {
                        events.emit(EngineEvent::PlayerStateChanged(tracker.observe(update)));
                    }
                }
                None => {
                    events.emit(EngineEvent::NotReady { device_id: ready_id.clone() });
                    break;
                }
            },
        }
    }
}

/// The part of a librespot player event that concerns playback state.
#[derive(Debug, Clone, PartialEq)]
enum PlaybackUpdate {
    TrackChanged(Track),
    Playing { position_ms: u32 },
    Paused { position_ms: u32 },
    Moved { position_ms: u32 },
    Stopped,
    EndOfTrack,
}

impl PlaybackUpdate {
    fn from_player_event(event: PlayerEvent) -> Option<Self> {
        let update = match event {
            PlayerEvent::TrackChanged { audio_item } => {
                tracing::info!(track = %audio_item.name, "PlayerEvent::TrackChanged");
                Self::TrackChanged(track_from_audio_item(&audio_item))
            }
            PlayerEvent::Playing { position_ms, .. } => Self::Playing { position_ms },
            PlayerEvent::Paused { position_ms, .. } => Self::Paused { position_ms },
            PlayerEvent::Seeked { position_ms, .. }
            | PlayerEvent::PositionChanged { position_ms, .. } => Self::Moved { position_ms },
            PlayerEvent::Stopped { .. } => Self::Stopped,
            PlayerEvent::EndOfTrack { .. } => Self::EndOfTrack,
            _ => return None,
        };
        Some(update)
    }
}

/// Folds fine-grained playback updates into whole-state snapshots.
#[derive(Debug, Default)]
struct StateTracker {
    track: Option<Track>,
    paused: bool,
    position_ms: u32,
    duration_ms: u32,
}

impl StateTracker {
    /// Returns `None` while no track is known yet.
    fn observe(&mut self, update: PlaybackUpdate) -> Option<PlayerState> {
        match update {
            PlaybackUpdate::TrackChanged(track) => {
                self.duration_ms = track.duration_ms;
                self.position_ms = 0;
                self.track = Some(track);
            }
            PlaybackUpdate::Playing { position_ms } => {
                self.paused = false;
                self.position_ms = position_ms;
            }
            PlaybackUpdate::Paused { position_ms } => {
                self.paused = true;
                self.position_ms = position_ms;
            }
            PlaybackUpdate::Moved { position_ms } => {
                self.position_ms = position_ms;
            }
            PlaybackUpdate::Stopped => {
                self.paused = true;
                self.position_ms = 0;
            }
            PlaybackUpdate::EndOfTrack => {
                self.paused = true;
            }
        }
        self.state()
    }

    fn state(&self) -> Option<PlayerState> {
        self.track.as_ref().map(|track| PlayerState {
            current_track: track.clone(),
            paused: self.paused,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
        })
    }
}

/// Base-62 id at the end of a `spotify:<kind>:<id>` uri.
fn id_from_uri(uri: &str) -> String {
    uri.rsplit(':').next().unwrap_or_default().to_string()
}

fn track_from_audio_item(item: &AudioItem) -> Track {
    let (artists, album) = match &item.unique_fields {
        UniqueFields::Track { artists, album, .. } => (
            artists
                .0
                .iter()
                .map(|a| Artist {
                    id: None,
                    name: a.name.clone(),
                })
                .collect(),
            album.clone(),
        ),
        UniqueFields::Episode { show_name, .. } => (
            vec![Artist {
                id: None,
                name: show_name.clone(),
            }],
            "Podcast".to_string(),
        ),
        UniqueFields::Local { artists, album, .. } => (
            artists
                .iter()
                .map(|name| Artist {
                    id: None,
                    name: name.clone(),
                })
                .collect(),
            album.clone().unwrap_or_default(),
        ),
    };

    let uri = item.track_id.to_uri().unwrap_or_default();
    let id = id_from_uri(&uri);
    let images = item
        .covers
        .iter()
        .map(|cover| Image {
            url: cover.url.clone(),
            width: None,
            height: None,
        })
        .collect();

    Track {
        id,
        uri,
        name: item.name.clone(),
        artists,
        album: Album {
            name: album,
            images,
        },
        duration_ms: item.duration_ms,
    }
}
