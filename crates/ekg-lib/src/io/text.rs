//! Newline-delimited R-peak annotation files.

use anyhow::{Context, Result};
use std::{fmt::Display, path::Path, str::FromStr};

fn parse_lines<T>(text: &str, what: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val = trimmed
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("line {} is not {}: {}", idx + 1, what, trimmed))?;
        out.push(val);
    }
    Ok(out)
}

/// Parse R-peak sample indices, one per line. An empty file is a valid
/// annotation with no beats.
pub fn parse_peak_indices(text: &str) -> Result<Vec<usize>> {
    parse_lines(text, "an integer index")
}

pub fn read_peak_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_peak_indices(&text)
}
