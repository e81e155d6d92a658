//! Fixed-capacity sliding window of recent records.

use std::collections::VecDeque;

use crate::error::ConfigError;
use crate::record::MeasurementRecord;

/// Default number of records kept in the window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Ordered history of the most recent records, oldest first.
///
/// Insertion order is the only order. When a push would exceed the capacity
/// the oldest record is evicted first.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    records: VecDeque<MeasurementRecord>,
    capacity: usize,
}

impl SlidingWindowBuffer {
    /// Create an empty window holding at most `capacity` records.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append to the tail, evicting from the head. Returns the evicted record.
    pub fn push(&mut self, record: MeasurementRecord) -> Option<MeasurementRecord> {
        debug_assert!(
            self.records
                .back()
                .is_none_or(|last| last.sequence() < record.sequence()),
            "records must arrive in increasing sequence order"
        );
        self.records.push_back(record);
        let mut evicted = None;
        while self.records.len() > self.capacity {
            evicted = self.records.pop_front();
        }
        evicted
    }

    /// Independent copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<MeasurementRecord> {
        self.records.iter().copied().collect()
    }

    /// Most recent record, or `None` before the first one arrives.
    pub fn latest(&self) -> Option<MeasurementRecord> {
        self.records.back().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeasurementRecord> {
        self.records.iter()
    }
}
