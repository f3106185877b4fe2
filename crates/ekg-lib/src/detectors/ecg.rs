use crate::{
    error::AnalysisResult,
    signal::{RPeakSet, TimeSeries},
};
use serde::{Deserialize, Serialize};

/// Locates heartbeat events in a single-lead waveform.
///
/// Implementations must return strictly increasing, in-bounds indices. Fewer
/// than two peaks is a legitimate outcome for short or noisy recordings.
pub trait BeatDetector: Send + Sync {
    fn detect(&self, ts: &TimeSeries) -> AnalysisResult<RPeakSet>;
}

/// Configurable parameters for the ECG beat detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgPipelineConfig {
    /// Lower cutoff for the single-pole high-pass filter (Hz).
    pub lowcut_hz: f64,
    /// Upper cutoff for the single-pole low-pass filter (Hz).
    pub highcut_hz: f64,
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Minimum physiological RR distance / refractory period (seconds).
    pub min_rr_s: f64,
    /// Scale between noise and signal envelopes for the adaptive threshold.
    pub threshold_scale: f64,
    /// How far back to search (seconds) for the precise R-peak after a detection.
    pub search_back_s: f64,
}

impl Default for EcgPipelineConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            min_rr_s: 0.280,
            threshold_scale: 0.6,
            search_back_s: 0.150,
        }
    }
}

/// Pan–Tompkins-style detector: band-pass, derivative, squaring, moving
/// window integration, then an adaptive threshold with refractory period.
#[derive(Debug, Clone, Default)]
pub struct PanTompkins {
    pub cfg: EcgPipelineConfig,
}

impl PanTompkins {
    pub fn new(cfg: EcgPipelineConfig) -> Self {
        Self { cfg }
    }
}

impl BeatDetector for PanTompkins {
    fn detect(&self, ts: &TimeSeries) -> AnalysisResult<RPeakSet> {
        RPeakSet::try_new(detect_r_peaks_with_config(ts, &self.cfg), ts.len())
    }
}

/// Peaks supplied from an external annotation instead of being detected.
#[derive(Debug, Clone)]
pub struct AnnotatedPeaks {
    indices: Vec<usize>,
}

impl AnnotatedPeaks {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }
}

impl BeatDetector for AnnotatedPeaks {
    fn detect(&self, ts: &TimeSeries) -> AnalysisResult<RPeakSet> {
        RPeakSet::try_new(self.indices.clone(), ts.len())
    }
}

/// Detect R-peaks with the default configuration but a caller-chosen refractory period.
pub fn detect_r_peaks(ts: &TimeSeries, min_rr_s: f64) -> AnalysisResult<RPeakSet> {
    let cfg = EcgPipelineConfig {
        min_rr_s: min_rr_s.max(0.15),
        ..EcgPipelineConfig::default()
    };
    PanTompkins::new(cfg).detect(ts)
}

fn detect_r_peaks_with_config(ts: &TimeSeries, cfg: &EcgPipelineConfig) -> Vec<usize> {
    if ts.is_empty() {
        return Vec::new();
    }

    let (bandpassed, integrated) = pan_tompkins_envelope(ts, cfg);
    let peaks = pick_peaks(&bandpassed, &integrated, ts.fs(), cfg);

    if peaks.len() < 2 {
        // Adaptive threshold never settled; retry with the local-maximum picker.
        return fallback_peak_picker(ts, cfg);
    }

    peaks
}

fn pan_tompkins_envelope(ts: &TimeSeries, cfg: &EcgPipelineConfig) -> (Vec<f64>, Vec<f64>) {
    let fs = ts.fs().max(1.0);
    let bandpassed = bandpass(ts.samples(), fs, cfg.lowcut_hz, cfg.highcut_hz);
    let squared: Vec<f64> = derivative(&bandpassed).iter().map(|x| x * x).collect();
    let win = ((cfg.integration_window_s * fs).round() as usize).max(1);
    let integrated = moving_average(&squared, win);
    (bandpassed, integrated)
}

fn bandpass(data: &[f64], fs: f64, low: f64, high: f64) -> Vec<f64> {
    let hp = if low > 0.0 {
        single_pole_highpass(data, fs, low)
    } else {
        data.to_vec()
    };
    if high <= 0.0 || high >= fs * 0.5 {
        hp
    } else {
        single_pole_lowpass(&hp, fs, high)
    }
}

fn rc_constant(cutoff: f64) -> f64 {
    1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01))
}

fn single_pole_highpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let Some(&first) = data.first() else {
        return Vec::new();
    };
    let dt = 1.0 / fs;
    let rc = rc_constant(cutoff);
    let alpha = rc / (rc + dt);
    let mut prev_y = first;
    let mut prev_x = first;
    data.iter()
        .map(|&x| {
            let y = alpha * (prev_y + x - prev_x);
            prev_y = y;
            prev_x = x;
            y
        })
        .collect()
}

fn single_pole_lowpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let Some(&first) = data.first() else {
        return Vec::new();
    };
    let dt = 1.0 / fs;
    let alpha = dt / (rc_constant(cutoff) + dt);
    let mut prev = first;
    data.iter()
        .map(|&x| {
            prev += alpha * (x - prev);
            prev
        })
        .collect()
}

fn derivative(data: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        out[i] = data[i] - data[i - 1];
    }
    out
}

fn moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if win <= 1 {
        return data.to_vec();
    }
    let mut out = vec![0.0; data.len()];
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= win {
            acc -= data[i - win];
        }
        out[i] = acc / win as f64;
    }
    out
}

fn pick_peaks(
    bandpassed: &[f64],
    envelope: &[f64],
    fs: f64,
    cfg: &EcgPipelineConfig,
) -> Vec<usize> {
    if bandpassed.is_empty() || envelope.is_empty() {
        return Vec::new();
    }

    let refractory = (cfg.min_rr_s * fs).round().max(1.0) as usize;
    let search = (cfg.search_back_s * fs).round().max(1.0) as usize;

    // Seed both envelope levels from the first second of signal.
    let init = envelope.len().min((fs as usize).max(1));
    let avg = envelope[..init].iter().sum::<f64>() / init as f64;
    let mut signal_level = avg;
    let mut noise_level = avg * 0.5;
    let mut threshold = noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
    let mut last_peak_sample = 0usize;
    let mut peaks = Vec::new();

    for (i, &sample) in envelope.iter().enumerate() {
        let refractory_ok = peaks.is_empty() || i - last_peak_sample >= refractory;
        if sample >= threshold && refractory_ok {
            let start = i.saturating_sub(search);
            let end = i.min(bandpassed.len() - 1);
            let mut idx = start;
            let mut max_val = f64::MIN;
            for (j, &value) in bandpassed.iter().enumerate().take(end + 1).skip(start) {
                if value > max_val {
                    max_val = value;
                    idx = j;
                }
            }
            peaks.push(idx);
            last_peak_sample = i;
            signal_level = 0.125 * sample + 0.875 * signal_level;
        } else {
            noise_level = 0.125 * sample + 0.875 * noise_level;
        }

        threshold = noise_level + cfg.threshold_scale * (signal_level - noise_level).max(0.0);
    }

    peaks.sort_unstable();
    peaks.dedup();
    peaks
}

fn fallback_peak_picker(ts: &TimeSeries, cfg: &EcgPipelineConfig) -> Vec<usize> {
    let data = ts.samples();
    if data.len() < 3 {
        return Vec::new();
    }
    let min_gap = (cfg.min_rr_s * ts.fs()).max(1.0) as usize;
    let win = ((0.150 * ts.fs()) as usize).max(1);
    let baseline = moving_average(data, win);
    let detrended: Vec<f64> = data.iter().zip(&baseline).map(|(x, m)| x - m).collect();

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..data.len() - 1 {
        let y = detrended[i];
        if y > 0.0 && y > detrended[i - 1] && y > detrended[i + 1] {
            let spaced = peaks.last().map_or(true, |&last| i - last >= min_gap);
            if spaced {
                peaks.push(i);
            }
        }
    }
    peaks
}
