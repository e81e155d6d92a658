//! Telemetry line grammar and the measurement record it produces.
//!
//! A line is accepted when it contains, in this order, `raw=<uint>`,
//! `filtered=<uint>` and `digit=<uint>`. Anything around those fields (a
//! `POT:` prefix, log tags, trailing text) is ignored. A value token runs until
//! whitespace, `,`, `;` or end of line and must consist of ASCII digits only.
//!
//! ```
//! use potscope_core::record;
//!
//! let reading = record::parse("POT: raw=2048 filtered=2011 digit=4").unwrap();
//! assert_eq!(reading.raw(), 2048);
//! assert_eq!(reading.filtered(), 2011);
//! assert_eq!(reading.digit(), 4);
//!
//! assert!(record::parse("POT: raw=2048 digit=4").is_err());
//! ```

use serde::Serialize;

use crate::error::{Field, ParseFailure};

/// Largest value the `digit` field may carry.
pub const MAX_DIGIT: u8 = 9;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// The three wire fields of a line that matched the grammar.
///
/// Only [`parse`] builds one, so every reading (and every record made from it)
/// comes from a fully matched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    raw: u32,
    filtered: u32,
    digit: u8,
}

impl Reading {
    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn filtered(&self) -> u32 {
        self.filtered
    }

    pub fn digit(&self) -> u8 {
        self.digit
    }

    /// Stamp the reading with its ingestion sequence number.
    pub fn into_record(self, sequence: u64) -> MeasurementRecord {
        MeasurementRecord {
            raw: self.raw,
            filtered: self.filtered,
            digit: self.digit,
            sequence,
        }
    }
}

// ---------------------------------------------------------------------------
// MeasurementRecord
// ---------------------------------------------------------------------------

/// One accepted telemetry sample. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeasurementRecord {
    raw: u32,
    filtered: u32,
    digit: u8,
    sequence: u64,
}

impl MeasurementRecord {
    /// Sensor reading before filtering. Not range-checked.
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Smoothed value computed on the device.
    pub fn filtered(&self) -> u32 {
        self.filtered
    }

    /// Discrete classification of `filtered`, in `0..=9`.
    pub fn digit(&self) -> u8 {
        self.digit
    }

    /// Count of records accepted before this one.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse one line (trailing newline already stripped).
///
/// Pure: no shared state, safe to call from any thread.
pub fn parse(line: &str) -> Result<Reading, ParseFailure> {
    let (raw, rest) = field_value(line, 0, Field::Raw)?;
    let (filtered, rest) = field_value(line, rest, Field::Filtered)?;
    let (digit, _) = field_value(line, rest, Field::Digit)?;

    let raw = u32::try_from(raw).map_err(|_| ParseFailure::Overflow(Field::Raw))?;
    let filtered =
        u32::try_from(filtered).map_err(|_| ParseFailure::Overflow(Field::Filtered))?;
    let digit = match u8::try_from(digit) {
        Ok(d) if d <= MAX_DIGIT => d,
        _ => return Err(ParseFailure::DigitOutOfRange(digit)),
    };

    Ok(Reading {
        raw,
        filtered,
        digit,
    })
}

/// Locate `field` at or after byte offset `from` and parse its value.
///
/// Returns the value and the offset just past its token.
fn field_value(line: &str, from: usize, field: Field) -> Result<(u64, usize), ParseFailure> {
    let start = find_key(line, from, field.key()).ok_or(ParseFailure::MissingField(field))?;
    let value_start = start + field.key().len();
    let token_len = line[value_start..]
        .find(|c: char| c.is_ascii_whitespace() || c == ',' || c == ';')
        .unwrap_or(line.len() - value_start);
    let token = &line[value_start..value_start + token_len];
    let end = value_start + token_len;

    if let Some(digits) = token.strip_prefix('-')
        && is_uint(digits)
    {
        return Err(ParseFailure::NegativeValue(field));
    }
    if !is_uint(token) {
        return Err(ParseFailure::InvalidValue {
            field,
            value: token.to_string(),
        });
    }
    // All ASCII digits: the only way parsing can fail is overflow.
    let value = token
        .parse::<u64>()
        .map_err(|_| ParseFailure::Overflow(field))?;
    Ok((value, end))
}

/// Find `key` at a word boundary, so `raw=` does not match inside `xraw=`.
fn find_key(line: &str, from: usize, key: &str) -> Option<usize> {
    let mut offset = from;
    while let Some(pos) = line[offset..].find(key) {
        let at = offset + pos;
        let boundary = line[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        if boundary {
            return Some(at);
        }
        offset = at + key.len();
    }
    None
}

fn is_uint(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
