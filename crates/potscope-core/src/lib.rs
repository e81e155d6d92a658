//! # potscope-core
//!
//! **Watch an ADC signal-conditioning pipeline live, from its serial chatter.**
//!
//! A device prints one line per sample (`POT: raw=2048 filtered=2011 digit=4`).
//! This crate turns that stream into structured records, keeps a bounded
//! recent history, and drives a fixed-rate render callback with immutable
//! snapshots of it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::io::Cursor;
//! use potscope_core::{LineReader, Monitor, MonitorConfig};
//!
//! let monitor = Monitor::new(MonitorConfig::default()).unwrap();
//! let source = LineReader::new(Cursor::new(b"POT: raw=100 filtered=98 digit=2\n".to_vec()));
//! let cancel = monitor.cancel_token();
//!
//! let outcome = monitor
//!     .run(source, |snap| {
//!         if let Some(noise) = snap.noise {
//!             println!("#{} noise={noise}", snap.tick);
//!         }
//!         if snap.is_terminal() {
//!             cancel.cancel();
//!         }
//!     })
//!     .unwrap();
//! println!("{} records, {}", outcome.counters.records_accepted, outcome.status);
//! ```
//!
//! ## Architecture
//!
//! byte stream → [`LineReader`] → [`IngestLoop`] → [`record::parse`] →
//! [`SlidingWindowBuffer`] (inside [`LiveState`]) → on each tick
//! [`RefreshScheduler`] → render callback.
//!
//! Ingestion and rendering run on separate threads and share nothing but
//! [`LiveState`]. One [`CancelToken`] stops both.

pub mod cancel;
pub mod config;
pub mod error;
pub mod ingest;
pub mod live;
pub mod monitor;
pub mod record;
pub mod scheduler;
pub mod source;
pub mod stats;
pub mod window;

pub use cancel::CancelToken;
pub use config::{
    DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_REFRESH_PERIOD_MS, MonitorConfig,
};
pub use error::{ConfigError, Field, ParseFailure};
pub use ingest::{IngestLoop, IngestStatus, StreamEnd};
pub use live::{CounterSnapshot, IngestCounters, LiveState, RejectedLine};
pub use monitor::{IngestHandle, Monitor, MonitorOutcome};
pub use record::{MeasurementRecord, Reading};
pub use scheduler::{RefreshScheduler, RefreshSnapshot, SchedulerReport};
pub use source::{LineReader, LineSource, MAX_LINE_BYTES, ReadEvent, ThreadedSource};
pub use stats::{WindowStats, noise};
pub use window::{DEFAULT_WINDOW_CAPACITY, SlidingWindowBuffer};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
