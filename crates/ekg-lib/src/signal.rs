use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Uniformly sampled single-lead waveform.
///
/// Sample `i` sits at `i / fs` seconds. The sampling rate is fixed when the
/// series is built and cannot change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    fs: f64,
    data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }

    /// Uniform sampling frequency in Hz
    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn samples(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }

    /// Time in seconds of sample `index`.
    pub fn time(&self, index: usize) -> f64 {
        index as f64 / self.fs
    }

    /// `(time, amplitude)` pairs in sample order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(i, value)| (self.time(i), *value))
    }
}

/// Detected heartbeat locations as sample indices into one [`TimeSeries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RPeakSet {
    indices: Vec<usize>,
}

impl RPeakSet {
    /// Validate detector output against the series it was computed on.
    pub fn try_new(indices: Vec<usize>, series_len: usize) -> AnalysisResult<Self> {
        if let Some(w) = indices.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AnalysisError::InvalidPeaks(format!(
                "indices must be strictly increasing ({} followed by {})",
                w[0], w[1]
            )));
        }
        if let Some(&last) = indices.last() {
            if last >= series_len {
                return Err(AnalysisError::InvalidPeaks(format!(
                    "index {} out of bounds for series of {} samples",
                    last, series_len
                )));
            }
        }
        Ok(Self { indices })
    }

    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    /// Consecutive peak spacings in seconds. Taken from the index difference so
    /// equal spacing gives bit-identical intervals anywhere in the recording.
    pub fn from_peaks(ts: &TimeSeries, peaks: &RPeakSet) -> Self {
        let rr = peaks
            .indices()
            .windows(2)
            .map(|w| (w[1] - w[0]) as f64 / ts.fs())
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }
}
