//! Player bridge - owns the playback engine and projects its events
//!
//! The bridge holds at most one engine instance at a time. Engine events are
//! queued on a channel and applied by whoever owns the bridge, in arrival
//! order, through [`PlayerBridge::drain_events`] or
//! [`PlayerBridge::next_event`].
//!
//! - `engine`: the engine seam (events, commands, launcher)
//! - `snapshot`: the playback snapshot and the event projection

mod engine;
mod snapshot;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::auth::Credential;

pub use engine::{
    EngineEvent, EngineHandle, EngineLauncher, EngineOptions, EventSink, PlaybackEngine,
    PlayerState, TokenProvider,
};
pub use snapshot::{BridgeState, EngineErrorKind, EngineFault, PlaybackSnapshot};

use engine::StampedEvent;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("no credential available")]
    MissingCredential,

    #[error("playback engine unavailable: {0}")]
    EngineUnavailable(String),
}

/// Receives engine errors the bridge does not act on.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, fault: &EngineFault);
}

/// Writes engine errors to the log.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, fault: &EngineFault) {
        tracing::error!(kind = %fault.kind, message = %fault.message, "Playback engine error");
    }
}

/// Fixed settings every engine instance is created with.
#[derive(Clone, Debug)]
pub struct BridgeOptions {
    pub player_name: String,
    pub volume: f32,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            player_name: "Spotify Music Player".to_string(),
            volume: 0.5,
        }
    }
}

pub struct PlayerBridge<L: EngineLauncher> {
    launcher: L,
    options: BridgeOptions,
    reporter: Arc<dyn ErrorReporter>,
    handle: Option<EngineHandle<L::Engine>>,
    /// Read by the live instance's token provider
    credential: Arc<RwLock<Credential>>,
    generation: u64,
    state: BridgeState,
    snapshot: PlaybackSnapshot,
    events_tx: mpsc::UnboundedSender<StampedEvent>,
    events_rx: mpsc::UnboundedReceiver<StampedEvent>,
}

impl<L: EngineLauncher> PlayerBridge<L> {
    pub fn new(launcher: L, options: BridgeOptions) -> Self {
        Self::with_reporter(launcher, options, Arc::new(LogReporter))
    }

    pub fn with_reporter(
        launcher: L,
        options: BridgeOptions,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            launcher,
            options,
            reporter,
            handle: None,
            credential: Arc::new(RwLock::new(Credential::new(""))),
            generation: 0,
            state: BridgeState::Uninitialized,
            snapshot: PlaybackSnapshot::default(),
            events_tx,
            events_rx,
        }
    }

    /// Creates and connects a new engine instance for `credential`.
    ///
    /// Any live instance is disconnected first. Connection completes
    /// asynchronously and is reported through events.
    pub async fn initialize(&mut self, credential: Credential) -> Result<(), BridgeError> {
        if credential.is_empty() {
            return Err(BridgeError::MissingCredential);
        }

        self.launcher.ensure_loaded().await?;
        self.dispose();

        self.generation += 1;
        let generation = self.generation;
        // A fresh cell per instance so a disposed engine never sees later tokens
        self.credential = Arc::new(RwLock::new(credential));
        let cell = self.credential.clone();
        let token_provider: TokenProvider = Arc::new(move || {
            cell.read().unwrap_or_else(PoisonError::into_inner).clone()
        });
        let options = EngineOptions {
            name: self.options.player_name.clone(),
            token_provider,
            volume: self.options.volume,
        };
        let sink = EventSink::new(generation, self.events_tx.clone());

        let mut engine = self.launcher.create(options, sink);
        engine.connect();

        self.handle = Some(EngineHandle::new(engine, generation));
        self.state = BridgeState::Initializing;
        tracing::info!(
            generation,
            name = %self.options.player_name,
            "Playback engine initializing"
        );
        Ok(())
    }

    /// Hands a refreshed token to the live instance without reconnecting it.
    ///
    /// The engine picks it up the next time it asks its token provider.
    pub fn refresh_credential(&self, credential: Credential) -> Result<(), BridgeError> {
        if credential.is_empty() {
            return Err(BridgeError::MissingCredential);
        }
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
        tracing::debug!(generation = self.generation, "Engine credential refreshed");
        Ok(())
    }

    /// Disconnects the live instance, if any, and resets the snapshot.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!(generation = handle.generation(), "Disposing playback engine");
            drop(handle);
        }
        self.state = BridgeState::Uninitialized;
        self.snapshot = PlaybackSnapshot::default();
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn has_engine(&self) -> bool {
        self.handle.is_some()
    }

    /// Applies every queued event. Returns how many were applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(stamped) = self.events_rx.try_recv() {
            if self.apply(stamped) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next event from the live instance and applies it.
    pub async fn next_event(&mut self) {
        while let Some(stamped) = self.events_rx.recv().await {
            if self.apply(stamped) {
                return;
            }
        }
    }

    fn apply(&mut self, stamped: StampedEvent) -> bool {
        let live = self
            .handle
            .as_ref()
            .is_some_and(|handle| handle.generation() == stamped.generation);
        if !live {
            tracing::trace!(
                generation = stamped.generation,
                event = ?stamped.event,
                "Dropping event from disposed engine"
            );
            return false;
        }

        match &stamped.event {
            EngineEvent::Ready { device_id } => {
                tracing::info!(device_id = %device_id, "Ready with device ID");
            }
            EngineEvent::NotReady { device_id } => {
                tracing::info!(device_id = %device_id, "Device ID has gone offline");
            }
            _ => tracing::trace!(event = ?stamped.event, "Engine event"),
        }

        let (next, fault) = snapshot::project(self.state, &mut self.snapshot, stamped.event);
        self.state = next;
        if let Some(fault) = fault {
            self.reporter.report(&fault);
        }
        true
    }

    pub fn toggle_play(&self) {
        if let Some(handle) = &self.handle {
            handle.engine().toggle_play();
        }
    }

    pub fn next_track(&self) {
        if let Some(handle) = &self.handle {
            handle.engine().next_track();
        }
    }

    pub fn previous_track(&self) {
        if let Some(handle) = &self.handle {
            handle.engine().previous_track();
        }
    }

    pub fn seek(&self, target_ms: u32) {
        if let Some(handle) = &self.handle {
            handle.engine().seek(target_ms);
        }
    }

    /// Seeks to `fraction` of the current track's duration.
    pub fn seek_fraction(&self, fraction: f64) {
        let duration_ms = self.snapshot.duration_ms;
        if duration_ms == 0 {
            return;
        }
        let target = (fraction.clamp(0.0, 1.0) * duration_ms as f64) as u32;
        self.seek(target);
    }
}

impl<L: EngineLauncher> Drop for PlayerBridge<L> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Call, FakeLauncher, Journal};
    use super::*;
    use crate::model::{Album, Track};
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct RecordingReporter {
        faults: Mutex<Vec<EngineFault>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, fault: &EngineFault) {
            self.faults.lock().unwrap().push(fault.clone());
        }
    }

    fn bridge() -> (PlayerBridge<FakeLauncher>, Arc<Journal>) {
        let launcher = FakeLauncher::default();
        let journal = launcher.journal.clone();
        (PlayerBridge::new(launcher, BridgeOptions::default()), journal)
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            uri: format!("spotify:track:{id}"),
            name: format!("Song {id}"),
            artists: Vec::new(),
            album: Album::default(),
            duration_ms: 180_000,
        }
    }

    fn state_changed(id: &str, position_ms: u32) -> EngineEvent {
        EngineEvent::PlayerStateChanged(Some(PlayerState {
            current_track: track(id),
            paused: false,
            position_ms,
            duration_ms: 180_000,
        }))
    }

    #[tokio::test]
    async fn initialize_configures_and_connects_one_engine() {
        let (mut bridge, journal) = bridge();

        bridge.initialize(Credential::new("token-1")).await.unwrap();

        assert_eq!(bridge.state(), BridgeState::Initializing);
        assert!(bridge.has_engine());
        assert_eq!(journal.calls(), vec![Call::Connect(0)]);

        let options = journal.options.lock().unwrap()[0].clone();
        assert_eq!(options.name, "Spotify Music Player");
        assert_eq!(options.volume, 0.5);
        assert_eq!((options.token_provider)().secret(), "token-1");
    }

    #[tokio::test]
    async fn refreshed_credential_reaches_live_engine_without_reconnect() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token-1")).await.unwrap();
        journal.sink(0).emit(state_changed("t1", 5_000));
        bridge.drain_events();

        bridge.refresh_credential(Credential::new("token-2")).unwrap();

        let options = journal.options.lock().unwrap()[0].clone();
        assert_eq!((options.token_provider)().secret(), "token-2");
        assert_eq!(journal.calls(), vec![Call::Connect(0)]);
        assert_eq!(bridge.snapshot().position_ms, 5_000);
        assert!(matches!(
            bridge.refresh_credential(Credential::new("")),
            Err(BridgeError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn disposed_engine_keeps_its_last_credential() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token-1")).await.unwrap();
        bridge.initialize(Credential::new("token-2")).await.unwrap();

        bridge.refresh_credential(Credential::new("token-3")).unwrap();

        let options = journal.options.lock().unwrap().clone();
        assert_eq!((options[0].token_provider)().secret(), "token-1");
        assert_eq!((options[1].token_provider)().secret(), "token-3");
    }

    #[tokio::test]
    async fn initialize_rejects_empty_credential() {
        let (mut bridge, journal) = bridge();

        let result = bridge.initialize(Credential::new("")).await;

        assert!(matches!(result, Err(BridgeError::MissingCredential)));
        assert!(!bridge.has_engine());
        assert_eq!(bridge.state(), BridgeState::Uninitialized);
        assert_eq!(journal.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn initialize_surfaces_load_failure() {
        let launcher = FakeLauncher {
            fail_load: true,
            ..Default::default()
        };
        let mut bridge = PlayerBridge::new(launcher, BridgeOptions::default());

        let result = bridge.initialize(Credential::new("token")).await;

        assert!(matches!(result, Err(BridgeError::EngineUnavailable(_))));
        assert!(!bridge.has_engine());
    }

    #[tokio::test]
    async fn reinitialize_disconnects_previous_engine_first() {
        let (mut bridge, journal) = bridge();

        bridge.initialize(Credential::new("token-1")).await.unwrap();
        bridge.initialize(Credential::new("token-2")).await.unwrap();

        assert_eq!(
            journal.calls(),
            vec![Call::Connect(0), Call::Disconnect(0), Call::Connect(1)]
        );
        assert_eq!(journal.max_connected.load(Ordering::SeqCst), 1);
        assert_eq!(journal.connected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn events_from_disposed_engine_are_dropped() {
        let (mut bridge, journal) = bridge();

        bridge.initialize(Credential::new("token-1")).await.unwrap();
        let stale = journal.sink(0);
        bridge.initialize(Credential::new("token-2")).await.unwrap();

        stale.emit(EngineEvent::Ready {
            device_id: "old".into(),
        });
        stale.emit(state_changed("old", 1_000));

        assert_eq!(bridge.drain_events(), 0);
        assert_eq!(bridge.snapshot(), &PlaybackSnapshot::default());
        assert_eq!(bridge.state(), BridgeState::Initializing);
    }

    #[tokio::test]
    async fn ready_then_not_ready_keeps_last_playback() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token")).await.unwrap();
        let sink = journal.sink(0);

        sink.emit(EngineEvent::Ready {
            device_id: "abc".into(),
        });
        bridge.drain_events();
        assert!(bridge.snapshot().ready);
        assert_eq!(bridge.snapshot().device_id, "abc");
        assert_eq!(bridge.state(), BridgeState::ReadyIdle);

        sink.emit(state_changed("t1", 12_000));
        bridge.drain_events();
        assert_eq!(bridge.state(), BridgeState::ReadyActive);
        let before = bridge.snapshot().clone();

        sink.emit(EngineEvent::NotReady {
            device_id: "abc".into(),
        });
        bridge.drain_events();

        let after = bridge.snapshot();
        assert!(!after.ready);
        assert_eq!(after.device_id, "");
        assert_eq!(after.track, before.track);
        assert_eq!(after.position_ms, before.position_ms);
        assert_eq!(after.duration_ms, before.duration_ms);
        assert_eq!(bridge.state(), BridgeState::Offline);
    }

    #[tokio::test]
    async fn rapid_state_changes_apply_in_order() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token")).await.unwrap();
        let sink = journal.sink(0);

        sink.emit(state_changed("first", 1_000));
        sink.emit(state_changed("second", 2_000));

        assert_eq!(bridge.drain_events(), 2);
        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.track.as_ref().map(|t| t.id.as_str()), Some("second"));
        assert_eq!(snapshot.position_ms, 2_000);
    }

    #[tokio::test]
    async fn next_event_waits_for_live_event() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token-1")).await.unwrap();
        let stale = journal.sink(0);
        bridge.initialize(Credential::new("token-2")).await.unwrap();
        let live = journal.sink(1);

        stale.emit(EngineEvent::Ready {
            device_id: "old".into(),
        });
        live.emit(EngineEvent::Ready {
            device_id: "new".into(),
        });
        bridge.next_event().await;

        assert_eq!(bridge.snapshot().device_id, "new");
    }

    #[tokio::test]
    async fn engine_errors_are_reported_without_state_change() {
        let launcher = FakeLauncher::default();
        let journal = launcher.journal.clone();
        let reporter = Arc::new(RecordingReporter::default());
        let mut bridge =
            PlayerBridge::with_reporter(launcher, BridgeOptions::default(), reporter.clone());
        bridge.initialize(Credential::new("token")).await.unwrap();
        let sink = journal.sink(0);

        sink.emit(EngineEvent::AccountError {
            message: "Premium required".into(),
        });
        sink.emit(EngineEvent::Ready {
            device_id: "abc".into(),
        });
        bridge.drain_events();

        let faults = reporter.faults.lock().unwrap().clone();
        assert_eq!(
            faults,
            vec![EngineFault {
                kind: EngineErrorKind::Account,
                message: "Premium required".into(),
            }]
        );
        assert_eq!(bridge.state(), BridgeState::ReadyIdle);
    }

    #[test]
    fn commands_without_engine_are_noops() {
        let (bridge, journal) = bridge();

        bridge.toggle_play();
        bridge.next_track();
        bridge.previous_track();
        bridge.seek(30_000);
        bridge.seek_fraction(0.5);

        assert!(journal.calls().is_empty());
        assert_eq!(bridge.state(), BridgeState::Uninitialized);
    }

    #[tokio::test]
    async fn commands_forward_to_live_engine() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token")).await.unwrap();

        bridge.toggle_play();
        bridge.next_track();
        bridge.previous_track();

        assert_eq!(
            journal.calls(),
            vec![
                Call::Connect(0),
                Call::TogglePlay(0),
                Call::Next(0),
                Call::Previous(0)
            ]
        );
    }

    #[tokio::test]
    async fn seek_only_moves_snapshot_after_state_event() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token")).await.unwrap();
        let sink = journal.sink(0);
        sink.emit(state_changed("t1", 5_000));
        bridge.drain_events();

        bridge.seek(30_000);

        assert!(journal.calls().contains(&Call::Seek(0, 30_000)));
        assert_eq!(bridge.snapshot().position_ms, 5_000);

        sink.emit(state_changed("t1", 30_000));
        bridge.drain_events();
        assert_eq!(bridge.snapshot().position_ms, 30_000);
    }

    #[tokio::test]
    async fn seek_fraction_uses_current_duration() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token")).await.unwrap();

        bridge.seek_fraction(0.5);
        assert!(!journal.calls().iter().any(|c| matches!(c, Call::Seek(..))));

        journal.sink(0).emit(state_changed("t1", 0));
        bridge.drain_events();
        bridge.seek_fraction(0.5);

        assert!(journal.calls().contains(&Call::Seek(0, 90_000)));
    }

    #[tokio::test]
    async fn dispose_disconnects_and_resets_snapshot() {
        let (mut bridge, journal) = bridge();
        bridge.initialize(Credential::new("token")).await.unwrap();
        journal.sink(0).emit(EngineEvent::Ready {
            device_id: "abc".into(),
        });
        bridge.drain_events();

        bridge.dispose();

        assert!(!bridge.has_engine());
        assert_eq!(bridge.state(), BridgeState::Uninitialized);
        assert_eq!(bridge.snapshot(), &PlaybackSnapshot::default());
        assert_eq!(journal.calls().last(), Some(&Call::Disconnect(0)));
        bridge.toggle_play();
        assert_eq!(journal.calls().len(), 2);
    }
}
