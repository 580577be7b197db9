//! Playback snapshot and the projection of engine events onto it

use std::fmt;

use crate::model::Track;

use super::engine::EngineEvent;

/// Lifecycle of the bridge as seen from the outside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BridgeState {
    #[default]
    Uninitialized,
    Initializing,
    ReadyIdle,
    ReadyActive,
    Offline,
}

/// Renderable view of the engine's playback state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub ready: bool,
    /// Empty unless the most recent readiness event was "ready".
    pub device_id: String,
    pub playing: bool,
    pub track: Option<Track>,
    pub position_ms: u32,
    pub duration_ms: u32,
}

impl PlaybackSnapshot {
    pub fn progress_ratio(&self) -> f64 {
        if self.duration_ms > 0 {
            (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineErrorKind {
    Initialization,
    Authentication,
    Account,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initialization => "initialization",
            Self::Authentication => "authentication",
            Self::Account => "account",
        };
        f.write_str(label)
    }
}

/// A non-fatal engine error that needs reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineFault {
    pub kind: EngineErrorKind,
    pub message: String,
}

/// Applies one event to `snapshot` and returns the next bridge state, plus a
/// fault when the event was an engine error.
pub(crate) fn project(
    state: BridgeState,
    snapshot: &mut PlaybackSnapshot,
    event: EngineEvent,
) -> (BridgeState, Option<EngineFault>) {
    match event {
        EngineEvent::Ready { device_id } => {
            snapshot.device_id = device_id;
            snapshot.ready = true;
            (BridgeState::ReadyIdle, None)
        }
        EngineEvent::NotReady { .. } => {
            // Track, position and duration stay at their last observed values.
            snapshot.device_id.clear();
            snapshot.ready = false;
            (BridgeState::Offline, None)
        }
        EngineEvent::PlayerStateChanged(None) => (state, None),
        EngineEvent::PlayerStateChanged(Some(update)) => {
            *snapshot = PlaybackSnapshot {
                track: Some(update.current_track),
                playing: !update.paused,
                position_ms: update.position_ms,
                duration_ms: update.duration_ms,
                ..std::mem::take(snapshot)
            };
            let next = match state {
                BridgeState::ReadyIdle | BridgeState::ReadyActive => BridgeState::ReadyActive,
                other => other,
            };
            (next, None)
        }
        EngineEvent::InitializationError { message } => (
            state,
            Some(EngineFault {
                kind: EngineErrorKind::Initialization,
                message,
            }),
        ),
        EngineEvent::AuthenticationError { message } => (
            state,
            Some(EngineFault {
                kind: EngineErrorKind::Authentication,
                message,
            }),
        ),
        EngineEvent::AccountError { message } => (
            state,
            Some(EngineFault {
                kind: EngineErrorKind::Account,
                message,
            }),
        ),
    }
}
