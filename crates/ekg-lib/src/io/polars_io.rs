use crate::{
    error::{AnalysisError, AnalysisResult},
    signal::TimeSeries,
};
use polars::prelude::*;
use std::path::Path;

/// Load one lead from a CSV through polars; nulls are rejected like unparsable cells.
pub fn load_lead(path: &Path, col: &str, fs: f64) -> AnalysisResult<TimeSeries> {
    let malformed = |err: PolarsError| AnalysisError::MalformedInput(err.to_string());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(malformed)?
        .finish()
        .map_err(malformed)?;
    let column = df
        .column(col)
        .map_err(|_| AnalysisError::MalformedInput(format!("missing lead column '{}'", col)))?
        .cast(&DataType::Float64)
        .map_err(malformed)?;
    let values = column.f64().map_err(malformed)?;
    if values.null_count() > 0 {
        return Err(AnalysisError::MalformedInput(format!(
            "{} non-numeric value(s) in '{}'",
            values.null_count(),
            col
        )));
    }
    let data: Vec<f64> = values.into_no_null_iter().collect();
    if data.is_empty() {
        return Err(AnalysisError::MalformedInput(
            "table contains no samples".into(),
        ));
    }
    Ok(TimeSeries::new(fs, data))
}
