//! In-memory engine used by unit tests across the crate

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{BridgeError, EngineLauncher, EngineOptions, EventSink, PlaybackEngine};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Connect(usize),
    Disconnect(usize),
    TogglePlay(usize),
    Next(usize),
    Previous(usize),
    Seek(usize, u32),
}

/// Everything the fake engines were asked to do, shared with the test.
#[derive(Default)]
pub(crate) struct Journal {
    pub calls: Mutex<Vec<Call>>,
    pub sinks: Mutex<Vec<EventSink>>,
    pub options: Mutex<Vec<EngineOptions>>,
    pub connected: AtomicUsize,
    pub max_connected: AtomicUsize,
    pub loads: AtomicUsize,
}

impl Journal {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Event sink handed to the `index`-th engine created.
    pub fn sink(&self, index: usize) -> EventSink {
        self.sinks.lock().unwrap()[index].clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub(crate) struct FakeEngine {
    id: usize,
    journal: Arc<Journal>,
}

impl PlaybackEngine for FakeEngine {
    fn connect(&mut self) {
        self.journal.record(Call::Connect(self.id));
        let now = self.journal.connected.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.max_connected.fetch_max(now, Ordering::SeqCst);
    }

    fn disconnect(&mut self) {
        self.journal.record(Call::Disconnect(self.id));
        self.journal.connected.fetch_sub(1, Ordering::SeqCst);
    }

    fn toggle_play(&self) {
        self.journal.record(Call::TogglePlay(self.id));
    }

    fn next_track(&self) {
        self.journal.record(Call::Next(self.id));
    }

    fn previous_track(&self) {
        self.journal.record(Call::Previous(self.id));
    }

    fn seek(&self, position_ms: u32) {
        self.journal.record(Call::Seek(self.id, position_ms));
    }
}

#[derive(Default)]
pub(crate) struct FakeLauncher {
    pub journal: Arc<Journal>,
    pub fail_load: bool,
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    type Engine = FakeEngine;

    async fn ensure_loaded(&self) -> Result<(), BridgeError> {
        self.journal.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(BridgeError::EngineUnavailable("no audio sink".into()));
        }
        Ok(())
    }

    fn create(&self, options: EngineOptions, events: EventSink) -> FakeEngine {
        let mut sinks = self.journal.sinks.lock().unwrap();
        let id = sinks.len();
        sinks.push(events);
        self.journal.options.lock().unwrap().push(options);
        FakeEngine {
            id,
            journal: self.journal.clone(),
        }
    }
}
