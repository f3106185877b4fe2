//! Backend-agnostic figure model for review images, plus a PNG backend.

mod render;

pub use render::PngBackend;

use crate::signal::{RPeakSet, TimeSeries};
use serde::{Deserialize, Serialize};

/// Vertical grid spacing of standard ECG paper (large squares), seconds.
pub const ECG_MAJOR_GRID_S: f64 = 0.2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub width: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub radius: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Figure {
    pub series: Vec<Series>,
    /// Spacing of vertical grid lines along x, if any.
    pub x_grid_step: Option<f64>,
}

impl Figure {
    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series, padded when degenerate.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for p in self.series.iter().flat_map(|s| s.points()) {
            x = (x.0.min(p[0]), x.1.max(p[0]));
            y = (y.0.min(p[1]), y.1.max(p[1]));
        }
        if !x.0.is_finite() {
            return (0.0, 1.0, 0.0, 1.0);
        }
        if x.1 - x.0 <= f64::EPSILON {
            x.1 = x.0 + 1.0;
        }
        if y.1 - y.0 <= f64::EPSILON {
            y = (y.0 - 0.5, y.1 + 0.5);
        }
        let pad = (y.1 - y.0) * 0.05;
        (x.0, x.1, y.0 - pad, y.1 + pad)
    }
}

pub trait PlotBackend {
    type Error;
    fn draw(&mut self, fig: &Figure) -> Result<(), Self::Error>;
}

/// Reduce a dense trace to at most `max_points` while keeping each bucket's
/// extremes, so narrow QRS spikes survive.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || max_points < 2 {
        return points.to_vec();
    }
    let buckets = max_points / 2;
    let bucket_size = points.len() as f64 / buckets as f64;
    let mut result = Vec::with_capacity(buckets * 2);
    for i in 0..buckets {
        let start = (i as f64 * bucket_size).floor() as usize;
        let end = (((i + 1) as f64 * bucket_size).floor() as usize).min(points.len());
        let Some(bucket) = points.get(start..end).filter(|b| !b.is_empty()) else {
            continue;
        };
        let lo = bucket.iter().min_by(|a, b| a[1].total_cmp(&b[1]));
        let hi = bucket.iter().max_by(|a, b| a[1].total_cmp(&b[1]));
        if let (Some(lo), Some(hi)) = (lo, hi) {
            if lo[0] <= hi[0] {
                result.push(*lo);
                result.push(*hi);
            } else {
                result.push(*hi);
                result.push(*lo);
            }
        }
    }
    result
}

/// Waveform trace with a marker at every detected R-peak.
pub fn figure_from_ecg(series: &TimeSeries, peaks: &RPeakSet, max_points: usize) -> Figure {
    let points: Vec<[f64; 2]> = series.points().map(|(t, v)| [t, v]).collect();
    let markers: Vec<[f64; 2]> = peaks.indices().iter().map(|&i| points[i]).collect();
    let mut fig = Figure {
        series: Vec::with_capacity(2),
        x_grid_step: Some(ECG_MAJOR_GRID_S),
    };
    fig.add_series(Series::Line(LineSeries {
        name: "ECG".into(),
        points: decimate_points(&points, max_points),
        width: 1,
        color: Color(0x1F3A93),
    }));
    fig.add_series(Series::Markers(MarkerSeries {
        name: "R-peaks".into(),
        points: markers,
        radius: 4,
        color: Color(0xE3120B),
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_sit_on_exact_peak_samples() {
        let data: Vec<f64> = (0..2000).map(|i| (i as f64 * 0.01).sin()).collect();
        let ts = TimeSeries::new(500.0, data.clone());
        let peaks = RPeakSet::try_new(vec![3, 777, 1999], ts.len()).unwrap();
        let fig = figure_from_ecg(&ts, &peaks, 400);
        let Series::Markers(markers) = &fig.series[1] else {
            panic!("expected marker series");
        };
        assert_eq!(markers.points.len(), 3);
        assert_eq!(markers.points[1], [777.0 / 500.0, data[777]]);
        assert_eq!(fig.series[0].points().len(), 400);
    }

    #[test]
    fn decimation_keeps_spikes() {
        let mut points: Vec<[f64; 2]> = (0..10_000).map(|i| [i as f64, 0.0]).collect();
        points[4321][1] = 5.0;
        let reduced = decimate_points(&points, 100);
        assert!(reduced.len() <= 100);
        assert!(reduced.iter().any(|p| p[1] == 5.0));
        assert!(reduced.windows(2).all(|w| w[0][0] <= w[1][0]));
    }

    #[test]
    fn bounds_pad_flat_traces() {
        let mut fig = Figure::default();
        fig.add_series(Series::Line(LineSeries {
            name: "flat".into(),
            points: vec![[0.0, 1.0], [2.0, 1.0]],
            width: 1,
            color: Color(0),
        }));
        let (x0, x1, y0, y1) = fig.bounds();
        assert_eq!((x0, x1), (0.0, 2.0));
        assert!(y0 < 1.0 && y1 > 1.0);
    }

    #[test]
    fn color_splits_channels() {
        assert_eq!(Color(0xE3120B).rgb(), (0xE3, 0x12, 0x0B));
    }
}
