//! Point-in-time diagnostics derived from records.
//!
//! Everything here is a pure function of its input. Nothing accumulates
//! between calls, so the numbers can never drift from what the window holds.

use serde::Serialize;

use crate::record::MeasurementRecord;

/// Instantaneous noise: `|raw - filtered|`.
pub fn noise(record: &MeasurementRecord) -> u32 {
    record.raw().abs_diff(record.filtered())
}

/// Summary statistics over one window snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub count: usize,
    pub mean_raw: f64,
    pub mean_filtered: f64,
    pub mean_noise: f64,
    pub peak_noise: u32,
    pub raw_min: u32,
    pub raw_max: u32,
    pub raw_std: f64,
    pub filtered_std: f64,
    /// `filtered_std / raw_std`; below 1.0 means the filter is smoothing.
    /// `None` when the raw signal is flat.
    pub noise_reduction: Option<f64>,
    /// Number of times `digit` changed between consecutive records.
    pub digit_transitions: usize,
}

impl WindowStats {
    /// Compute over `records`. Returns `None` for an empty window.
    pub fn from_records(records: &[MeasurementRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let n = records.len() as f64;

        let mean_raw = records.iter().map(|r| f64::from(r.raw())).sum::<f64>() / n;
        let mean_filtered = records.iter().map(|r| f64::from(r.filtered())).sum::<f64>() / n;
        let mean_noise = records.iter().map(|r| f64::from(noise(r))).sum::<f64>() / n;
        let peak_noise = records.iter().map(noise).max().unwrap_or(0);
        let raw_min = records.iter().map(MeasurementRecord::raw).min().unwrap_or(0);
        let raw_max = records.iter().map(MeasurementRecord::raw).max().unwrap_or(0);

        let raw_std = std_dev(records.iter().map(|r| f64::from(r.raw())), mean_raw, n);
        let filtered_std = std_dev(
            records.iter().map(|r| f64::from(r.filtered())),
            mean_filtered,
            n,
        );
        let noise_reduction = if raw_std > 1e-10 {
            Some(filtered_std / raw_std)
        } else {
            None
        };

        let digit_transitions = records
            .windows(2)
            .filter(|p| p[0].digit() != p[1].digit())
            .count();

        Some(Self {
            count: records.len(),
            mean_raw,
            mean_filtered,
            mean_noise,
            peak_noise,
            raw_min,
            raw_max,
            raw_std,
            filtered_std,
            noise_reduction,
            digit_transitions,
        })
    }
}

/// Population standard deviation.
fn std_dev(values: impl Iterator<Item = f64>, mean: f64, n: f64) -> f64 {
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    fn rec(raw: u32, filtered: u32, digit: u8, seq: u64) -> MeasurementRecord {
        record::parse(&format!("raw={raw} filtered={filtered} digit={digit}"))
            .unwrap()
            .into_record(seq)
    }

    #[test]
    fn noise_is_absolute_difference() {
        assert_eq!(noise(&rec(100, 98, 2, 0)), 2);
        assert_eq!(noise(&rec(150, 200, 4, 0)), 50);
    }

    #[test]
    fn noise_zero_when_equal() {
        assert_eq!(noise(&rec(2048, 2048, 5, 0)), 0);
    }

    #[test]
    fn noise_full_scale() {
        assert_eq!(noise(&rec(0, 4095, 9, 0)), 4095);
        assert_eq!(noise(&rec(4095, 0, 0, 0)), 4095);
    }

    #[test]
    fn stats_empty_window() {
        assert_eq!(WindowStats::from_records(&[]), None);
    }

    #[test]
    fn stats_basic() {
        let records = [rec(100, 98, 2, 0), rec(200, 150, 4, 1), rec(300, 250, 4, 2)];
        let s = WindowStats::from_records(&records).unwrap();
        assert_eq!(s.count, 3);
        assert!((s.mean_raw - 200.0).abs() < 1e-10);
        assert!((s.mean_filtered - 166.0).abs() < 1e-10);
        assert!((s.mean_noise - 34.0).abs() < 1e-10);
        assert_eq!(s.peak_noise, 50);
        assert_eq!(s.raw_min, 100);
        assert_eq!(s.raw_max, 300);
        assert_eq!(s.digit_transitions, 1);
    }

    #[test]
    fn stats_noise_reduction_for_smoothed_signal() {
        let records = [
            rec(100, 190, 1, 0),
            rec(300, 210, 1, 1),
            rec(100, 190, 1, 2),
            rec(300, 210, 1, 3),
        ];
        let s = WindowStats::from_records(&records).unwrap();
        assert!((s.raw_std - 100.0).abs() < 1e-10);
        assert!((s.filtered_std - 10.0).abs() < 1e-10);
        let ratio = s.noise_reduction.unwrap();
        assert!((ratio - 0.1).abs() < 1e-10);
    }

    #[test]
    fn stats_flat_raw_has_no_ratio() {
        let records = [rec(500, 500, 3, 0), rec(500, 500, 3, 1)];
        let s = WindowStats::from_records(&records).unwrap();
        assert_eq!(s.raw_std, 0.0);
        assert_eq!(s.noise_reduction, None);
        assert_eq!(s.digit_transitions, 0);
    }

    #[test]
    fn stats_are_a_function_of_input_only() {
        let records = [rec(10, 20, 1, 0), rec(30, 20, 2, 1)];
        let a = WindowStats::from_records(&records);
        let b = WindowStats::from_records(&records);
        assert_eq!(a, b);
    }
}
