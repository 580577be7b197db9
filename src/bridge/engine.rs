//! The seam between the bridge and a concrete playback engine.
//!
//! An engine is created by an [`EngineLauncher`], receives an [`EventSink`]
//! before it is connected, and reports everything that happens to it as
//! [`EngineEvent`]s. Commands are fire-and-forget.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::auth::Credential;
use crate::model::Track;

use super::BridgeError;

/// Supplies the current credential whenever the engine asks for one.
pub type TokenProvider = Arc<dyn Fn() -> Credential + Send + Sync>;

/// Construction parameters handed to every engine instance.
#[derive(Clone)]
pub struct EngineOptions {
    pub name: String,
    pub token_provider: TokenProvider,
    /// Output level in `0.0..=1.0`.
    pub volume: f32,
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("name", &self.name)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

/// Playback state as reported by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub current_track: Track,
    pub paused: bool,
    pub position_ms: u32,
    pub duration_ms: u32,
}

/// Everything an engine can tell the bridge.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    InitializationError { message: String },
    AuthenticationError { message: String },
    AccountError { message: String },
    /// `None` means the engine has nothing to report and the event is ignored.
    PlayerStateChanged(Option<PlayerState>),
    Ready { device_id: String },
    NotReady { device_id: String },
}

/// An event tagged with the instance that produced it.
#[derive(Debug)]
pub(crate) struct StampedEvent {
    pub generation: u64,
    pub event: EngineEvent,
}

/// Where an engine instance delivers its events.
///
/// Each sink is bound to one engine instance, so events still in flight from
/// a disposed instance can be told apart from the live one.
#[derive(Clone, Debug)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<StampedEvent>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<StampedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn emit(&self, event: EngineEvent) {
        if self
            .tx
            .send(StampedEvent {
                generation: self.generation,
                event,
            })
            .is_err()
        {
            tracing::trace!(generation = self.generation, "Bridge gone, dropping engine event");
        }
    }
}

/// A live playback engine instance.
pub trait PlaybackEngine: Send {
    /// Starts connecting. Completion is reported through the event sink.
    fn connect(&mut self);
    fn disconnect(&mut self);
    fn toggle_play(&self);
    fn next_track(&self);
    fn previous_track(&self);
    fn seek(&self, position_ms: u32);
}

/// Loads the engine runtime once and creates engine instances from it.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    type Engine: PlaybackEngine;

    /// Idempotent. Every caller awaits the same one-time load.
    async fn ensure_loaded(&self) -> Result<(), BridgeError>;

    /// Builds an instance wired to `events`. It must not connect yet.
    fn create(&self, options: EngineOptions, events: EventSink) -> Self::Engine;
}

/// Owning handle to the live engine instance. Dropping it disconnects.
pub struct EngineHandle<E: PlaybackEngine> {
    engine: E,
    generation: u64,
}

impl<E: PlaybackEngine> EngineHandle<E> {
    pub(crate) fn new(engine: E, generation: u64) -> Self {
        Self { engine, generation }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<E: PlaybackEngine> Drop for EngineHandle<E> {
    fn drop(&mut self) {
        tracing::debug!(generation = self.generation, "Disconnecting playback engine");
        self.engine.disconnect();
    }
}
