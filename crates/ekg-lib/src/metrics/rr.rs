//! RR-interval statistics used as classifier input.
//!
//! The feature order is fixed and shared with the pre-trained model:
//! mean, standard deviation, min, max, median, kurtosis, skewness, heart rate.
//!
//! Conventions:
//! - standard deviation is the population value (divides by `n`);
//! - skewness is the biased Fisher–Pearson coefficient `m3 / m2^1.5`;
//! - kurtosis is biased excess kurtosis `m4 / m2^2 - 3`;
//! - a zero-variance sample (all intervals equal, up to floating-point
//!   resolution) has skewness and kurtosis of exactly `0.0`;
//! - fewer than two peaks gives the all-zero vector.

use crate::signal::{RPeakSet, RRSeries, TimeSeries};
use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 8;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "mean_rr",
    "std_rr",
    "min_rr",
    "max_rr",
    "median_rr",
    "kurtosis_rr",
    "skewness_rr",
    "heart_rate",
];

/// Moments at or below this relative resolution are treated as zero variance.
const VARIANCE_RESOLUTION: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RRIntervalFeatureVector {
    /// Mean RR interval (s)
    pub mean_rr: f64,
    pub std_rr: f64,
    pub min_rr: f64,
    pub max_rr: f64,
    pub median_rr: f64,
    pub kurtosis_rr: f64,
    pub skewness_rr: f64,
    /// Instantaneous heart rate (beats/min)
    pub heart_rate: f64,
}

impl RRIntervalFeatureVector {
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Compute the statistics of an RR series; an empty series gives zeros.
    pub fn from_rr(rr: &RRSeries) -> Self {
        let values = &rr.rr;
        if values.is_empty() {
            return Self::zeros();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let m2 = central_moment(values, mean, 2);
        let (std, skewness, kurtosis) = if m2 <= (VARIANCE_RESOLUTION * mean).powi(2) {
            (0.0, 0.0, 0.0)
        } else {
            let m3 = central_moment(values, mean, 3);
            let m4 = central_moment(values, mean, 4);
            (m2.sqrt(), m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean_rr: mean,
            std_rr: std,
            min_rr: min,
            max_rr: max,
            median_rr: median(values),
            kurtosis_rr: kurtosis,
            skewness_rr: skewness,
            heart_rate: if mean > 0.0 { 60.0 / mean } else { 0.0 },
        }
    }

    /// Fields in classifier input order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.mean_rr,
            self.std_rr,
            self.min_rr,
            self.max_rr,
            self.median_rr,
            self.kurtosis_rr,
            self.skewness_rr,
            self.heart_rate,
        ]
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|v| *v == 0.0)
    }
}

/// Turn detected beats into the fixed-length feature vector.
pub fn extract_features(ts: &TimeSeries, peaks: &RPeakSet) -> RRIntervalFeatureVector {
    if peaks.len() < 2 {
        return RRIntervalFeatureVector::zeros();
    }
    RRIntervalFeatureVector::from_rr(&RRSeries::from_peaks(ts, peaks))
}

fn central_moment(values: &[f64], mean: f64, order: i32) -> f64 {
    values.iter().map(|x| (x - mean).powi(order)).sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    fn series(n: usize) -> TimeSeries {
        TimeSeries::new(500.0, vec![0.0; n])
    }

    #[test]
    fn one_second_spacing_gives_sixty_bpm() {
        let ts = series(5000);
        let peaks = RPeakSet::try_new(vec![0, 500, 1000, 1500, 2000], ts.len()).unwrap();
        let features = extract_features(&ts, &peaks);
        assert_eq!(features.mean_rr, 1.0);
        assert_eq!(features.std_rr, 0.0);
        assert_eq!(features.min_rr, 1.0);
        assert_eq!(features.max_rr, 1.0);
        assert_eq!(features.median_rr, 1.0);
        assert_eq!(features.kurtosis_rr, 0.0);
        assert_eq!(features.skewness_rr, 0.0);
        assert_eq!(features.heart_rate, 60.0);
    }

    #[test]
    fn fewer_than_two_peaks_is_all_zero() {
        let ts = series(5000);
        let none = RPeakSet::empty();
        let one = RPeakSet::try_new(vec![1200], ts.len()).unwrap();
        assert_eq!(extract_features(&ts, &none).to_array(), [0.0; FEATURE_COUNT]);
        assert_eq!(extract_features(&ts, &one).to_array(), [0.0; FEATURE_COUNT]);
        assert!(extract_features(&ts, &one).is_zero());
    }

    #[test]
    fn mean_matches_consecutive_time_differences() {
        let ts = series(6000);
        let idx = vec![37, 441, 905, 1298, 1751, 2260, 2640];
        let peaks = RPeakSet::try_new(idx.clone(), ts.len()).unwrap();
        let features = extract_features(&ts, &peaks);
        let diffs: Vec<f64> = idx
            .windows(2)
            .map(|w| ts.time(w[1]) - ts.time(w[0]))
            .collect();
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
        assert_close(features.mean_rr, mean, 1e-12);
        assert_close(features.heart_rate, 60.0 / mean, 1e-9);
    }

    #[test]
    fn moments_match_reference_values() {
        // Reference values from the biased (population) estimators.
        let rr = RRSeries {
            rr: vec![0.8, 0.9, 1.0, 1.2],
        };
        let f = RRIntervalFeatureVector::from_rr(&rr);
        assert_close(f.mean_rr, 0.975, 1e-12);
        assert_close(f.std_rr, 0.147_901_994_577_490_4, 1e-9);
        assert_close(f.median_rr, 0.95, 1e-12);
        assert_close(f.skewness_rr, 0.434_650_759_574_664, 1e-6);
        assert_close(f.kurtosis_rr, -1.154_285_714_285_715, 1e-6);
        assert_eq!(f.min_rr, 0.8);
        assert_eq!(f.max_rr, 1.2);
    }

    #[test]
    fn near_constant_intervals_use_zero_variance_convention() {
        // 0.8 s spacing does not subtract exactly in binary floating point.
        let ts = series(10_000);
        let peaks = RPeakSet::try_new(vec![0, 400, 800, 1200, 1600, 2000], ts.len()).unwrap();
        let f = extract_features(&ts, &peaks);
        assert!(f.skewness_rr.is_finite());
        assert_eq!(f.skewness_rr, 0.0);
        assert_eq!(f.kurtosis_rr, 0.0);
        assert_close(f.heart_rate, 75.0, 1e-9);
    }

    #[test]
    fn equal_spacing_anywhere_in_recording_is_zero_variance() {
        let ts = series(200_000);
        for start in [0, 5000, 10_000, 37_123, 60_001, 99_999, 150_000] {
            let indices: Vec<usize> = (0..8).map(|k| start + 400 * k).collect();
            let peaks = RPeakSet::try_new(indices, ts.len()).unwrap();
            let f = extract_features(&ts, &peaks);
            assert_eq!(f.std_rr, 0.0, "start {start}");
            assert_eq!(f.skewness_rr, 0.0, "start {start}");
            assert_eq!(f.kurtosis_rr, 0.0, "start {start}");
            assert_close(f.mean_rr, 0.8, 1e-12);
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let ts = series(4000);
        let peaks = RPeakSet::try_new(vec![100, 520, 980, 1390, 1850], ts.len()).unwrap();
        let first = extract_features(&ts, &peaks);
        let second = extract_features(&ts, &peaks);
        assert_eq!(first, second);
    }
}
