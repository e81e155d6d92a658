//! One monitoring run: shared state, ingestion thread and render scheduler.
//!
//! A [`Monitor`] is created once per run and torn down by cancelling its
//! token. The ingestion loop runs on its own thread; the scheduler runs on
//! whichever thread calls [`Monitor::run`] (or [`RefreshScheduler::run`]
//! directly), so renderers that must stay on the main thread, like a
//! terminal UI, can.

use std::io;
use std::thread::{self, JoinHandle};

use crate::cancel::CancelToken;
use crate::config::MonitorConfig;
use crate::error::ConfigError;
use crate::ingest::{IngestLoop, IngestStatus, StreamEnd};
use crate::live::{CounterSnapshot, LiveState};
use crate::record::MeasurementRecord;
use crate::scheduler::{RefreshScheduler, RefreshSnapshot, SchedulerReport};
use crate::source::LineSource;

/// Owns the state of one run.
pub struct Monitor {
    config: MonitorConfig,
    live: LiveState,
    scheduler: RefreshScheduler,
    cancel: CancelToken,
}

impl Monitor {
    /// Validate `config` and build an idle monitor. No thread is started.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let live = LiveState::new(config.window_capacity)?;
        let scheduler = RefreshScheduler::new(live.clone(), config.refresh_period)?;
        Ok(Self {
            config,
            live,
            scheduler,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn live(&self) -> &LiveState {
        &self.live
    }

    /// Token that stops both ingestion and rendering.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Start the ingestion loop on a dedicated thread.
    ///
    /// The source moves onto that thread and is dropped there when the loop
    /// ends.
    pub fn spawn_ingest<S>(&self, source: S) -> io::Result<IngestHandle>
    where
        S: LineSource + 'static,
    {
        let ingest = IngestLoop::new(source, self.live.clone(), self.cancel.clone());
        let handle = thread::Builder::new()
            .name("potscope-ingest".into())
            .spawn(move || ingest.run())?;
        Ok(IngestHandle { handle })
    }

    /// Ingest from `source` and render on this thread until cancelled.
    ///
    /// The stream closing does not stop rendering: the last snapshot keeps
    /// being delivered with its terminal status set, and the caller decides
    /// when to cancel.
    pub fn run<S, F>(&self, source: S, render: F) -> io::Result<MonitorOutcome>
    where
        S: LineSource + 'static,
        F: FnMut(&RefreshSnapshot),
    {
        let ingest = self.spawn_ingest(source)?;
        let scheduler = self.scheduler.run(&self.cancel, render);
        self.cancel.cancel();
        let status = ingest.join();
        Ok(MonitorOutcome {
            status,
            scheduler,
            counters: self.live.counters().snapshot(),
        })
    }

    /// Ingest from `source` on this thread, handing every accepted record to
    /// `on_record` as it arrives.
    ///
    /// No render ticks fire, so no record is lost to window eviction. Returns
    /// when the stream closes or the token is cancelled.
    pub fn ingest_with<S, F>(&self, source: S, on_record: F) -> MonitorOutcome
    where
        S: LineSource,
        F: FnMut(&MeasurementRecord),
    {
        let status = IngestLoop::new(source, self.live.clone(), self.cancel.clone())
            .run_with(on_record);
        MonitorOutcome {
            status,
            scheduler: SchedulerReport::default(),
            counters: self.live.counters().snapshot(),
        }
    }
}

/// Join handle for the ingestion thread.
pub struct IngestHandle {
    handle: JoinHandle<IngestStatus>,
}

impl IngestHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit and return its terminal status.
    pub fn join(self) -> IngestStatus {
        match self.handle.join() {
            Ok(status) => status,
            Err(_) => IngestStatus::StreamClosed(StreamEnd::Failed {
                kind: io::ErrorKind::Other,
                message: "ingestion thread panicked".into(),
            }),
        }
    }
}

/// Everything known about a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub status: IngestStatus,
    pub scheduler: SchedulerReport,
    pub counters: CounterSnapshot,
}
