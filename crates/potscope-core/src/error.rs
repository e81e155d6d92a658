//! Error taxonomy for the ingestion pipeline.
//!
//! Two kinds of failure live here. [`ParseFailure`] is recoverable and
//! expected at high frequency: it is counted and the stream moves on.
//! [`ConfigError`] is fatal and only ever raised before any thread starts.
//!
//! Stream-level failures are not errors in this sense: they end ingestion and
//! are reported once as [`crate::ingest::IngestStatus::StreamClosed`].

use thiserror::Error;

/// One of the three fields a telemetry line must carry, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Raw,
    Filtered,
    Digit,
}

impl Field {
    /// Wire key including the `=` separator.
    pub fn key(self) -> &'static str {
        match self {
            Self::Raw => "raw=",
            Self::Filtered => "filtered=",
            Self::Digit => "digit=",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Filtered => "filtered",
            Self::Digit => "digit",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a line was rejected. Never carries a partially built record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("missing field `{0}`")]
    MissingField(Field),

    #[error("field `{field}` is not a non-negative integer: {value:?}")]
    InvalidValue { field: Field, value: String },

    #[error("field `{0}` is negative")]
    NegativeValue(Field),

    #[error("field `{0}` overflows")]
    Overflow(Field),

    #[error("digit {0} outside 0..=9")]
    DigitOutOfRange(u64),
}

impl ParseFailure {
    /// The field the failure refers to, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::MissingField(f) | Self::NegativeValue(f) | Self::Overflow(f) => Some(*f),
            Self::InvalidValue { field, .. } => Some(*field),
            Self::DigitOutOfRange(_) => Some(Field::Digit),
        }
    }
}

/// Invalid construction parameters. Rejected before any task starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("window capacity must be greater than zero")]
    ZeroCapacity,

    #[error("refresh period must be greater than zero")]
    ZeroRefreshPeriod,

    #[error("read timeout must be greater than zero")]
    ZeroReadTimeout,
}
