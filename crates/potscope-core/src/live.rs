//! State shared between the ingestion task and the render task.
//!
//! One writer (ingestion) and one reader (the scheduler) meet here. The window,
//! the terminal status and the last rejected line sit behind a single mutex so
//! a snapshot is always taken from one consistent state, never interleaved
//! with a push. Counters are atomics so diagnostics can be read at any time
//! without touching the lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::error::{ConfigError, ParseFailure};
use crate::ingest::IngestStatus;
use crate::record::{MeasurementRecord, Reading};
use crate::scheduler::RefreshSnapshot;
use crate::stats::{WindowStats, noise};
use crate::window::SlidingWindowBuffer;

/// Rejected lines are kept for display up to this many characters.
const REJECTED_LINE_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Running diagnostics maintained by the ingestion loop.
#[derive(Debug, Default)]
pub struct IngestCounters {
    lines_read: AtomicU64,
    parse_failures: AtomicU64,
    read_timeouts: AtomicU64,
    records_accepted: AtomicU64,
}

impl IngestCounters {
    pub fn lines_read(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    pub fn parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    pub fn read_timeouts(&self) -> u64 {
        self.read_timeouts.load(Ordering::Relaxed)
    }

    pub fn records_accepted(&self) -> u64 {
        self.records_accepted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            lines_read: self.lines_read(),
            parse_failures: self.parse_failures(),
            read_timeouts: self.read_timeouts(),
            records_accepted: self.records_accepted(),
        }
    }

    pub(crate) fn line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn parse_failed(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn timed_out(&self) {
        self.read_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`IngestCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub lines_read: u64,
    pub parse_failures: u64,
    pub read_timeouts: u64,
    pub records_accepted: u64,
}

// ---------------------------------------------------------------------------
// RejectedLine
// ---------------------------------------------------------------------------

/// The most recent line that failed to parse, for on-screen diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// Line text, cut to a displayable length.
    pub text: String,
    pub reason: ParseFailure,
}

// ---------------------------------------------------------------------------
// LiveState
// ---------------------------------------------------------------------------

struct Inner {
    window: SlidingWindowBuffer,
    /// Sequence the next accepted reading receives.
    next_sequence: u64,
    status: Option<IngestStatus>,
    last_rejected: Option<RejectedLine>,
}

/// Cloneable handle to the state of one run.
#[derive(Clone)]
pub struct LiveState {
    inner: Arc<Mutex<Inner>>,
    counters: Arc<IngestCounters>,
}

impl LiveState {
    pub fn new(window_capacity: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                window: SlidingWindowBuffer::new(window_capacity)?,
                next_sequence: 0,
                status: None,
                last_rejected: None,
            })),
            counters: Arc::new(IngestCounters::default()),
        })
    }

    pub fn counters(&self) -> &IngestCounters {
        &self.counters
    }

    /// Append a record. Never blocks beyond the brief snapshot copy.
    ///
    /// `record` must be newer than everything already pushed.
    pub fn push(&self, record: MeasurementRecord) {
        let mut s = self.lock();
        s.next_sequence = s.next_sequence.max(record.sequence() + 1);
        s.window.push(record);
        self.counters.accepted();
    }

    /// Number `reading` with the next sequence and append it.
    ///
    /// Numbering lives with the window, so every loop feeding this state
    /// continues one shared sequence.
    pub fn push_reading(&self, reading: Reading) -> MeasurementRecord {
        let mut s = self.lock();
        let record = reading.into_record(s.next_sequence);
        s.next_sequence += 1;
        s.window.push(record);
        self.counters.accepted();
        record
    }

    pub fn record_rejection(&self, line: &str, reason: ParseFailure) {
        let text: String = line.chars().take(REJECTED_LINE_CHARS).collect();
        self.lock().last_rejected = Some(RejectedLine { text, reason });
    }

    /// Record the terminal status. Only the first call has any effect.
    pub fn finish(&self, status: IngestStatus) {
        let mut s = self.lock();
        if s.status.is_none() {
            s.status = Some(status);
        }
    }

    pub fn status(&self) -> Option<IngestStatus> {
        self.lock().status.clone()
    }

    /// Copy of the window contents, oldest first.
    pub fn window_snapshot(&self) -> Vec<MeasurementRecord> {
        self.lock().window.snapshot()
    }

    pub fn latest(&self) -> Option<MeasurementRecord> {
        self.lock().window.latest()
    }

    /// Capture everything a render needs in one lock.
    ///
    /// Statistics are computed after the lock is released.
    pub fn capture(&self, tick: u64) -> RefreshSnapshot {
        let (records, status, last_rejected, counters, capacity) = {
            let s = self.lock();
            (
                s.window.snapshot(),
                s.status.clone(),
                s.last_rejected.clone(),
                self.counters.snapshot(),
                s.window.capacity(),
            )
        };
        let latest = records.last().copied();
        RefreshSnapshot {
            tick,
            noise: latest.as_ref().map(noise),
            stats: WindowStats::from_records(&records),
            latest,
            records,
            window_capacity: capacity,
            counters,
            status,
            last_rejected,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
