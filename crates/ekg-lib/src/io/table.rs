use crate::{
    error::{AnalysisError, AnalysisResult},
    signal::TimeSeries,
};
use csv::ReaderBuilder;
#[cfg(not(feature = "polars"))]
use std::fs::File;
use std::{io::Read, path::Path};

/// Lead II column as exported by the acquisition device (leading space included).
pub const DEFAULT_LEAD_COLUMN: &str = " II";
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 500.0;

/// Turns an uploaded comma-separated table into a single-lead [`TimeSeries`].
///
/// Header names are matched exactly, whitespace included.
#[derive(Debug, Clone)]
pub struct WaveformIngestor {
    lead_column: String,
    fs: f64,
}

impl Default for WaveformIngestor {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_COLUMN, DEFAULT_SAMPLING_RATE_HZ)
    }
}

impl WaveformIngestor {
    pub fn new(lead_column: impl Into<String>, fs: f64) -> Self {
        Self {
            lead_column: lead_column.into(),
            fs,
        }
    }

    pub fn lead_column(&self) -> &str {
        &self.lead_column
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn read_bytes(&self, bytes: &[u8]) -> AnalysisResult<TimeSeries> {
        self.read(bytes)
    }

    /// Read a table from disk. With the `polars` feature the file goes through
    /// the polars CSV reader instead.
    #[cfg(feature = "polars")]
    pub fn read_path(&self, path: &Path) -> AnalysisResult<TimeSeries> {
        super::polars_io::load_lead(path, &self.lead_column, self.fs)
    }

    #[cfg(not(feature = "polars"))]
    pub fn read_path(&self, path: &Path) -> AnalysisResult<TimeSeries> {
        let file = File::open(path).map_err(|err| {
            AnalysisError::MalformedInput(format!("opening {}: {}", path.display(), err))
        })?;
        self.read(file)
    }

    pub fn read<R: Read>(&self, input: R) -> AnalysisResult<TimeSeries> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        let headers = reader
            .headers()
            .map_err(|err| AnalysisError::MalformedInput(format!("reading header: {}", err)))?
            .clone();
        let column = headers
            .iter()
            .position(|h| h == self.lead_column)
            .ok_or_else(|| {
                AnalysisError::MalformedInput(format!(
                    "missing lead column '{}'",
                    self.lead_column
                ))
            })?;

        let mut data = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|err| {
                AnalysisError::MalformedInput(format!("reading row {}: {}", row + 1, err))
            })?;
            let raw = record.get(column).ok_or_else(|| {
                AnalysisError::MalformedInput(format!(
                    "row {} has no '{}' value",
                    row + 1,
                    self.lead_column
                ))
            })?;
            let value: f64 = raw.trim().parse().map_err(|_| {
                AnalysisError::MalformedInput(format!(
                    "row {}: '{}' is not a number",
                    row + 1,
                    raw
                ))
            })?;
            data.push(value);
        }

        if data.is_empty() {
            return Err(AnalysisError::MalformedInput(
                "table contains no samples".into(),
            ));
        }
        Ok(TimeSeries::new(self.fs, data))
    }
}
