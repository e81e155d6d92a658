//! The ingestion loop: lines in, records into the window.
//!
//! ```text
//! WAITING_FOR_LINE ──line──▶ LINE_RECEIVED ──ok──▶ PUSHED ──┐
//!        ▲   │                      └──fail──▶ SKIPPED ─────┤
//!        │   └──timeout──┐                                  │
//!        └───────────────┴──────────────────────────────────┘
//!
//! terminal: STREAM_CLOSED (end of stream / read error), CANCELLED
//! ```
//!
//! A malformed line never ends the loop and a read timeout is not an error.
//! Only a closed or failed stream, or a cancellation request, stops it. The
//! source is dropped before the terminal status is published, so the device is
//! released exactly once whichever way the loop ends.

use std::fmt;
use std::io;

use crate::cancel::CancelToken;
use crate::live::LiveState;
use crate::record::{self, MeasurementRecord};
use crate::source::{LineSource, ReadEvent};

/// Why the stream stopped producing lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The source reported end of stream.
    Eof,
    /// The source failed with an unrecoverable I/O error.
    Failed { kind: io::ErrorKind, message: String },
}

/// Terminal condition of the ingestion loop, delivered once at exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    StreamClosed(StreamEnd),
    Cancelled,
}

impl IngestStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StreamClosed(_) => "STREAM_CLOSED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::StreamClosed(StreamEnd::Eof) => write!(f, "stream closed (end of stream)"),
            Self::StreamClosed(StreamEnd::Failed { message, .. }) => {
                write!(f, "stream closed: {message}")
            }
        }
    }
}

/// Reads lines from a source until it closes or the token is cancelled.
pub struct IngestLoop<S> {
    source: S,
    live: LiveState,
    cancel: CancelToken,
}

impl<S: LineSource> IngestLoop<S> {
    pub fn new(source: S, live: LiveState, cancel: CancelToken) -> Self {
        Self {
            source,
            live,
            cancel,
        }
    }

    /// Run to completion. Consumes the loop so the source is released on exit.
    pub fn run(self) -> IngestStatus {
        self.run_with(|_| {})
    }

    /// Like [`run`](Self::run), also handing every accepted record to
    /// `on_record` on this thread, right after it enters the window.
    pub fn run_with<F>(mut self, mut on_record: F) -> IngestStatus
    where
        F: FnMut(&MeasurementRecord),
    {
        log::info!("ingestion started");
        let status = self.pump(&mut on_record);

        let Self { source, live, .. } = self;
        drop(source);

        match &status {
            IngestStatus::StreamClosed(StreamEnd::Failed { kind, message }) => {
                log::warn!("ingestion stopped: read error ({kind:?}): {message}");
            }
            other => log::info!("ingestion stopped: {other}"),
        }
        live.finish(status.clone());
        status
    }

    fn pump<F: FnMut(&MeasurementRecord)>(&mut self, on_record: &mut F) -> IngestStatus {
        loop {
            if self.cancel.is_cancelled() {
                return IngestStatus::Cancelled;
            }
            match self.source.read_line() {
                Ok(ReadEvent::Line(line)) => self.handle_line(&line, on_record),
                Ok(ReadEvent::Timeout) => {
                    self.live.counters().timed_out();
                    log::trace!("read timed out, still waiting");
                }
                Ok(ReadEvent::Closed) => return IngestStatus::StreamClosed(StreamEnd::Eof),
                Err(e) => {
                    return IngestStatus::StreamClosed(StreamEnd::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    fn handle_line<F>(&mut self, line: &str, on_record: &mut F)
    where
        F: FnMut(&MeasurementRecord),
    {
        let counters = self.live.counters();
        counters.line_read();
        match record::parse(line) {
            Ok(reading) => on_record(&self.live.push_reading(reading)),
            Err(reason) => {
                counters.parse_failed();
                log::debug!("skipped line ({reason}): {line:?}");
                self.live.record_rejection(line, reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves scripted events, then `Closed` forever. Counts drops.
    struct ScriptedSource {
        events: VecDeque<io::Result<ReadEvent>>,
        drops: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(events: Vec<io::Result<ReadEvent>>) -> (Self, Arc<AtomicUsize>) {
            let drops = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    events: events.into(),
                    drops: Arc::clone(&drops),
                },
                drops,
            )
        }

        fn lines(lines: &[&str]) -> (Self, Arc<AtomicUsize>) {
            Self::new(
                lines
                    .iter()
                    .map(|l| Ok(ReadEvent::Line((*l).to_string())))
                    .collect(),
            )
        }
    }

    impl LineSource for ScriptedSource {
        fn read_line(&mut self) -> io::Result<ReadEvent> {
            self.events.pop_front().unwrap_or(Ok(ReadEvent::Closed))
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sequences(records: &[MeasurementRecord]) -> Vec<u64> {
        records.iter().map(MeasurementRecord::sequence).collect()
    }

    #[test]
    fn accepts_valid_and_counts_failures() {
        let (source, drops) = ScriptedSource::lines(&[
            "POT: raw=100 filtered=98 digit=2",
            "garbage",
            "POT: raw=200 filtered=150 digit=4",
        ]);
        let live = LiveState::new(10).unwrap();
        let status = IngestLoop::new(source, live.clone(), CancelToken::new()).run();

        assert_eq!(status, IngestStatus::StreamClosed(StreamEnd::Eof));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        let records = live.window_snapshot();
        assert_eq!(sequences(&records), vec![0, 1]);
        assert_eq!(records[1].raw(), 200);
        assert_eq!(live.counters().parse_failures(), 1);
        assert_eq!(live.counters().lines_read(), 3);
        assert_eq!(live.status(), Some(status));
    }

    #[test]
    fn sequence_counts_records_not_lines() {
        let (source, _) = ScriptedSource::lines(&[
            "bad",
            "raw=1 filtered=1 digit=1",
            "raw=-1 filtered=1 digit=1",
            "raw=1 filtered=1",
            "raw=2 filtered=2 digit=2",
        ]);
        let live = LiveState::new(10).unwrap();
        IngestLoop::new(source, live.clone(), CancelToken::new()).run();
        assert_eq!(sequences(&live.window_snapshot()), vec![0, 1]);
        assert_eq!(live.counters().parse_failures(), 3);
        assert_eq!(live.counters().records_accepted(), 2);
    }

    #[test]
    fn timeouts_are_not_failures() {
        let (source, _) = ScriptedSource::new(vec![
            Ok(ReadEvent::Timeout),
            Ok(ReadEvent::Timeout),
            Ok(ReadEvent::Timeout),
        ]);
        let live = LiveState::new(10).unwrap();
        let status = IngestLoop::new(source, live.clone(), CancelToken::new()).run();
        assert_eq!(status, IngestStatus::StreamClosed(StreamEnd::Eof));
        assert!(live.window_snapshot().is_empty());
        assert_eq!(live.counters().parse_failures(), 0);
        assert_eq!(live.counters().lines_read(), 0);
        assert_eq!(live.counters().read_timeouts(), 3);
    }

    #[test]
    fn read_error_closes_stream() {
        let (source, drops) = ScriptedSource::new(vec![
            Ok(ReadEvent::Line("raw=1 filtered=1 digit=1".into())),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")),
            Ok(ReadEvent::Line("raw=2 filtered=2 digit=2".into())),
        ]);
        let live = LiveState::new(10).unwrap();
        let status = IngestLoop::new(source, live.clone(), CancelToken::new()).run();
        assert_eq!(
            status,
            IngestStatus::StreamClosed(StreamEnd::Failed {
                kind: io::ErrorKind::BrokenPipe,
                message: "device unplugged".into(),
            })
        );
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(live.window_snapshot().len(), 1);
        assert_eq!(status.to_string(), "stream closed: device unplugged");
    }

    #[test]
    fn cancelled_before_start_reads_nothing() {
        let (source, drops) = ScriptedSource::lines(&["raw=1 filtered=1 digit=1"]);
        let live = LiveState::new(10).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let status = IngestLoop::new(source, live.clone(), cancel).run();
        assert_eq!(status, IngestStatus::Cancelled);
        assert!(live.window_snapshot().is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn window_capacity_applies() {
        let lines: Vec<String> = (0..5)
            .map(|i| format!("raw={i} filtered={i} digit=0"))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (source, _) = ScriptedSource::lines(&refs);
        let live = LiveState::new(2).unwrap();
        IngestLoop::new(source, live.clone(), CancelToken::new()).run();
        assert_eq!(sequences(&live.window_snapshot()), vec![3, 4]);
    }

    #[test]
    fn run_with_sees_every_record() {
        let lines: Vec<String> = (0..20)
            .map(|i| format!("raw={i} filtered=0 digit=0"))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (source, _) = ScriptedSource::lines(&refs);
        let live = LiveState::new(3).unwrap();

        let mut seen = Vec::new();
        let status = IngestLoop::new(source, live.clone(), CancelToken::new())
            .run_with(|r| seen.push((r.sequence(), r.raw())));

        assert_eq!(status, IngestStatus::StreamClosed(StreamEnd::Eof));
        assert_eq!(seen.len(), 20);
        let expected: Vec<(u64, u32)> = (0..20).map(|i| (i, i as u32)).collect();
        assert_eq!(seen, expected);
        assert_eq!(live.window_snapshot().len(), 3);
    }

    #[test]
    fn second_loop_continues_sequence() {
        let live = LiveState::new(10).unwrap();
        let (first, _) =
            ScriptedSource::lines(&["raw=1 filtered=1 digit=1", "raw=2 filtered=2 digit=2"]);
        IngestLoop::new(first, live.clone(), CancelToken::new()).run();
        let (second, _) = ScriptedSource::lines(&["raw=3 filtered=3 digit=3"]);
        IngestLoop::new(second, live.clone(), CancelToken::new()).run();

        assert_eq!(sequences(&live.window_snapshot()), vec![0, 1, 2]);
    }

    #[test]
    fn status_labels() {
        assert_eq!(IngestStatus::Cancelled.label(), "CANCELLED");
        assert_eq!(
            IngestStatus::StreamClosed(StreamEnd::Eof).label(),
            "STREAM_CLOSED"
        );
        assert!(IngestStatus::Cancelled.is_cancelled());
    }
}
