//! Headless mode: print accepted records as they arrive.

use std::io::{self, Write};

use potscope_core::{LineSource, MeasurementRecord, Monitor, MonitorOutcome, RefreshSnapshot, noise};

use crate::SourceArgs;

pub fn run(args: &SourceArgs, format: &str) {
    let monitor = super::make_monitor(args);
    let (source, label) = super::open_source_or_exit(args);

    let cancel = monitor.cancel_token();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            log::warn!("cannot install Ctrl+C handler: {e}");
        }
    }

    let config = monitor.config();
    eprintln!(
        "potscope {}: connected to {label} (window {}, refresh {}ms)",
        potscope_core::VERSION,
        config.window_capacity,
        config.refresh_period.as_millis()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut printer = RecordPrinter::new(format == "json");

    // Captures and stdin are printed record by record; only a live port is
    // sampled at the refresh period.
    let outcome = if args.input.is_some() {
        replay(&monitor, source, &mut printer, &mut out)
    } else {
        let outcome = monitor.run(source, |snap| {
            if let Err(e) = printer.emit(snap, &mut out) {
                // Downstream closed (e.g. piped into `head`).
                log::debug!("stdout closed: {e}");
                cancel.cancel();
            }
            if snap.is_terminal() {
                cancel.cancel();
            }
        });
        match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("Failed to start ingestion: {e}");
                std::process::exit(1);
            }
        }
    };

    let c = outcome.counters;
    eprintln!(
        "{}: {} records from {} lines ({} unparseable, {} read timeouts), {} printed",
        outcome.status, c.records_accepted, c.lines_read, c.parse_failures, c.read_timeouts,
        printer.printed
    );
    if printer.skipped > 0 {
        eprintln!(
            "{} record(s) left the window before they could be printed; raise --window or lower --refresh-ms",
            printer.skipped
        );
    }
    if outcome.scheduler.dropped_ticks > 0 {
        log::info!(
            "{} of {} ticks dropped",
            outcome.scheduler.dropped_ticks,
            outcome.scheduler.ticks + outcome.scheduler.dropped_ticks
        );
    }
}

/// Print every record `source` yields, in order, on the calling thread.
fn replay<S: LineSource>(
    monitor: &Monitor,
    source: S,
    printer: &mut RecordPrinter,
    out: &mut impl Write,
) -> MonitorOutcome {
    let cancel = monitor.cancel_token();
    let outcome = monitor.ingest_with(source, |record| {
        if cancel.is_cancelled() {
            return;
        }
        if let Err(e) = printer.print_record(record, out) {
            log::debug!("stdout closed: {e}");
            cancel.cancel();
        }
    });
    if let Err(e) = out.flush() {
        log::debug!("stdout closed: {e}");
    }
    outcome
}

/// Prints each record once across overlapping window snapshots.
struct RecordPrinter {
    json: bool,
    last_sequence: Option<u64>,
    printed: u64,
    skipped: u64,
}

impl RecordPrinter {
    fn new(json: bool) -> Self {
        Self {
            json,
            last_sequence: None,
            printed: 0,
            skipped: 0,
        }
    }

    fn emit(&mut self, snap: &RefreshSnapshot, out: &mut impl Write) -> io::Result<()> {
        let fresh = snap.records_after(self.last_sequence);
        if fresh.is_empty() {
            return Ok(());
        }

        let expected = self.last_sequence.map_or(0, |seq| seq + 1);
        let first = fresh[0].sequence();
        if first > expected {
            let gap = first - expected;
            self.skipped += gap;
            log::warn!("{gap} record(s) evicted before they were printed");
        }

        for record in fresh {
            self.print_record(record, out)?;
        }
        out.flush()
    }

    fn print_record(&mut self, record: &MeasurementRecord, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self.format(record))?;
        self.last_sequence = Some(record.sequence());
        self.printed += 1;
        Ok(())
    }

    fn format(&self, record: &MeasurementRecord) -> String {
        if self.json {
            serde_json::json!({
                "sequence": record.sequence(),
                "raw": record.raw(),
                "filtered": record.filtered(),
                "digit": record.digit(),
                "noise": noise(record),
            })
            .to_string()
        } else {
            format!(
                "#{:<6} raw={:>4} filtered={:>4} digit={} noise={:>4}",
                record.sequence(),
                record.raw(),
                record.filtered(),
                record.digit(),
                noise(record)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use potscope_core::{IngestStatus, LineReader, LiveState, MonitorConfig, StreamEnd, record};
    use std::io::Cursor;
    use std::time::Duration;

    fn push(live: &LiveState, raw: u32, filtered: u32, seq: u64) {
        let line = format!("raw={raw} filtered={filtered} digit=3");
        live.push(record::parse(&line).unwrap().into_record(seq));
    }

    fn lines(buf: &[u8]) -> Vec<String> {
        String::from_utf8(buf.to_vec())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn prints_each_record_once() {
        let live = LiveState::new(10).unwrap();
        let mut printer = RecordPrinter::new(false);
        let mut out = Vec::new();

        push(&live, 100, 98, 0);
        printer.emit(&live.capture(0), &mut out).unwrap();
        printer.emit(&live.capture(1), &mut out).unwrap();
        push(&live, 200, 150, 1);
        printer.emit(&live.capture(2), &mut out).unwrap();

        let printed = lines(&out);
        assert_eq!(printed.len(), 2);
        assert_eq!(printed[0], "#0      raw= 100 filtered=  98 digit=3 noise=   2");
        assert_eq!(printed[1], "#1      raw= 200 filtered= 150 digit=3 noise=  50");
        assert_eq!(printer.printed, 2);
        assert_eq!(printer.skipped, 0);
    }

    #[test]
    fn json_lines() {
        let live = LiveState::new(4).unwrap();
        push(&live, 0, 4095, 0);
        let mut printer = RecordPrinter::new(true);
        let mut out = Vec::new();
        printer.emit(&live.capture(0), &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["sequence"], 0);
        assert_eq!(value["raw"], 0);
        assert_eq!(value["filtered"], 4095);
        assert_eq!(value["noise"], 4095);
    }

    #[test]
    fn replay_prints_every_record_of_a_long_capture() {
        let config = MonitorConfig::default()
            .with_window_capacity(10)
            .with_refresh_period(Duration::from_millis(5))
            .with_read_timeout(Duration::from_millis(5));
        let monitor = Monitor::new(config).unwrap();
        let capture: String = (0..250)
            .map(|i| format!("POT: raw={i} filtered={i} digit={}\n", i % 10))
            .collect();
        let mut printer = RecordPrinter::new(true);
        let mut out = Vec::new();

        let outcome = replay(
            &monitor,
            LineReader::new(Cursor::new(capture.into_bytes())),
            &mut printer,
            &mut out,
        );

        assert_eq!(outcome.status, IngestStatus::StreamClosed(StreamEnd::Eof));
        assert_eq!(printer.printed, 250);
        assert_eq!(printer.skipped, 0);
        let sequences: Vec<u64> = lines(&out)
            .iter()
            .map(|l| {
                let value: serde_json::Value = serde_json::from_str(l).unwrap();
                value["sequence"].as_u64().unwrap()
            })
            .collect();
        assert_eq!(sequences, (0..250).collect::<Vec<u64>>());
    }

    #[test]
    fn counts_records_evicted_between_ticks() {
        let live = LiveState::new(2).unwrap();
        let mut printer = RecordPrinter::new(false);
        let mut out = Vec::new();

        push(&live, 1, 1, 0);
        printer.emit(&live.capture(0), &mut out).unwrap();
        for seq in 1..5 {
            push(&live, 1, 1, seq);
        }
        printer.emit(&live.capture(1), &mut out).unwrap();

        assert_eq!(printer.printed, 3);
        assert_eq!(printer.skipped, 2);
        assert_eq!(printer.last_sequence, Some(4));
    }
}
