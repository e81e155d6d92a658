//! Fixed-cadence render driver, decoupled from the ingestion rate.
//!
//! Every tick captures a fresh [`RefreshSnapshot`] from the shared state and
//! hands it to the render callback. The snapshot is dropped when the callback
//! returns. Ticks fire whether or not new data arrived, so a renderer always
//! shows the last known state, including after the stream has closed.
//!
//! Overload policy: drop. When a render runs past its period, the ticks whose
//! time has already passed are skipped (and counted) and the next render is
//! aligned to the period grid. Rendering happens at most once per period and
//! never holds the shared lock, so a slow renderer cannot stall ingestion.

use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::ConfigError;
use crate::ingest::IngestStatus;
use crate::live::{CounterSnapshot, LiveState, RejectedLine};
use crate::record::MeasurementRecord;
use crate::stats::WindowStats;

/// Immutable, render-ready view of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSnapshot {
    /// Zero-based tick number.
    pub tick: u64,
    /// Window contents, oldest first.
    pub records: Vec<MeasurementRecord>,
    pub latest: Option<MeasurementRecord>,
    /// Noise of `latest`.
    pub noise: Option<u32>,
    pub stats: Option<WindowStats>,
    pub window_capacity: usize,
    pub counters: CounterSnapshot,
    /// Set once ingestion has ended.
    pub status: Option<IngestStatus>,
    pub last_rejected: Option<RejectedLine>,
}

impl RefreshSnapshot {
    /// Whether ingestion has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_some()
    }

    /// Whether `other` shows the same window data (ignores tick and counters).
    pub fn same_data(&self, other: &Self) -> bool {
        self.records == other.records && self.latest == other.latest && self.noise == other.noise
    }

    /// Records with a sequence strictly greater than `after`.
    pub fn records_after(&self, after: Option<u64>) -> &[MeasurementRecord] {
        let start = match after {
            Some(seq) => self.records.partition_point(|r| r.sequence() <= seq),
            None => 0,
        };
        &self.records[start..]
    }
}

/// Totals reported when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Renders performed.
    pub ticks: u64,
    /// Ticks skipped because a render overran its period.
    pub dropped_ticks: u64,
}

/// Fires a render callback every `period` until cancelled.
pub struct RefreshScheduler {
    live: LiveState,
    period: Duration,
}

impl RefreshScheduler {
    pub fn new(live: LiveState, period: Duration) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::ZeroRefreshPeriod);
        }
        Ok(Self { live, period })
    }

    /// Render on every tick until `cancel` fires. Blocks the calling thread.
    ///
    /// The callback runs synchronously on this thread and may cancel the
    /// token itself to stop after the current tick.
    pub fn run<F>(&self, cancel: &CancelToken, mut render: F) -> SchedulerReport
    where
        F: FnMut(&RefreshSnapshot),
    {
        let mut report = SchedulerReport::default();
        let mut next_tick = Instant::now();

        while !cancel.is_cancelled() {
            let snapshot = self.live.capture(report.ticks);
            render(&snapshot);
            drop(snapshot);
            report.ticks += 1;

            next_tick += self.period;
            let now = Instant::now();
            if now > next_tick {
                let missed = self.missed_ticks(now - next_tick);
                report.dropped_ticks += missed;
                next_tick += self
                    .period
                    .saturating_mul(u32::try_from(missed).unwrap_or(u32::MAX));
                log::trace!("render overran its period, dropped {missed} tick(s)");
            }
            if !cancel.sleep(next_tick.saturating_duration_since(Instant::now())) {
                break;
            }
        }
        report
    }

    /// Ticks covered by `behind`, counting the one that is already late.
    fn missed_ticks(&self, behind: Duration) -> u64 {
        let periods = behind.as_nanos() / self.period.as_nanos();
        u64::try_from(periods).unwrap_or(u64::MAX / 2) + 1
    }
}
