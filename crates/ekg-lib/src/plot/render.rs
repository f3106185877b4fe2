use super::{Figure, PlotBackend, Series};
use crate::error::AnalysisError;
use plotters::prelude::*;
use std::path::PathBuf;

const GRID_COLOR: RGBColor = RGBColor(0xF4, 0xC2, 0xC2);

/// Draws a [`Figure`] into a PNG file.
///
/// No text is drawn: glyph rendering needs system fonts, which headless hosts
/// usually lack.
#[derive(Debug, Clone)]
pub struct PngBackend {
    pub path: PathBuf,
    pub size: (u32, u32),
}

impl PngBackend {
    pub fn new(path: impl Into<PathBuf>, size: (u32, u32)) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

fn to_rgb(color: super::Color) -> RGBColor {
    let (r, g, b) = color.rgb();
    RGBColor(r, g, b)
}

impl PlotBackend for PngBackend {
    type Error = AnalysisError;

    fn draw(&mut self, fig: &Figure) -> Result<(), AnalysisError> {
        let fail = |err: &dyn std::fmt::Display| AnalysisError::Artifact(err.to_string());
        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| fail(&e))?;
        let (x_min, x_max, y_min, y_max) = fig.bounds();
        let mut chart = ChartBuilder::on(&root)
            .margin(12)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| fail(&e))?;

        if let Some(step) = fig.x_grid_step.filter(|s| *s > 0.0) {
            let first = (x_min / step).ceil() as i64;
            let last = (x_max / step).floor() as i64;
            let lines = (first..=last).map(|k| {
                let x = k as f64 * step;
                PathElement::new(vec![(x, y_min), (x, y_max)], GRID_COLOR)
            });
            chart.draw_series(lines).map_err(|e| fail(&e))?;
        }

        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    let style = to_rgb(line.color).stroke_width(line.width);
                    chart
                        .draw_series(LineSeries::new(
                            line.points.iter().map(|p| (p[0], p[1])),
                            style,
                        ))
                        .map_err(|e| fail(&e))?;
                }
                Series::Markers(markers) => {
                    let style = to_rgb(markers.color).filled();
                    let radius = markers.radius as i32;
                    chart
                        .draw_series(
                            markers
                                .points
                                .iter()
                                .map(|p| Circle::new((p[0], p[1]), radius, style)),
                        )
                        .map_err(|e| fail(&e))?;
                }
            }
        }
        root.present().map_err(|e| fail(&e))?;
        Ok(())
    }
}
