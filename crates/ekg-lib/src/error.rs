//! Error taxonomy for the analysis core.
//!
//! Every failure an analysis run can hit is one of these variants. The
//! boundary layer turns them into a `{ success: false, ... }` response with
//! the status from [`AnalysisError::status`].

use thiserror::Error;

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Uploaded table is empty, lacks the lead column, or holds non-numeric samples.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Feature vector length does not match the frozen normalizer/classifier.
    #[error("shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The pre-trained artifacts could not be loaded at startup.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Peak indices that are not strictly increasing or fall outside the series.
    #[error("invalid R-peak set: {0}")]
    InvalidPeaks(String),

    /// Rendering or persisting the review image failed.
    #[error("artifact generation failed: {0}")]
    Artifact(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AnalysisError {
    /// HTTP-style status the boundary layer reports for this failure.
    pub fn status(&self) -> u16 {
        match self {
            AnalysisError::MalformedInput(_) => 400,
            AnalysisError::InvalidPeaks(_) => 422,
            AnalysisError::ShapeMismatch { .. } => 500,
            AnalysisError::Artifact(_) | AnalysisError::Config(_) => 500,
            AnalysisError::ModelUnavailable(_) => 503,
        }
    }

    /// Short human-readable cause, used as the `message` field of a failure response.
    pub fn summary(&self) -> &'static str {
        match self {
            AnalysisError::MalformedInput(_) => "The uploaded ECG file could not be read.",
            AnalysisError::InvalidPeaks(_) => "The detected heartbeats are inconsistent with the recording.",
            AnalysisError::ShapeMismatch { .. } => "The feature vector does not match the loaded model.",
            AnalysisError::ModelUnavailable(_) => "ECG classification is currently unavailable.",
            AnalysisError::Artifact(_) => "The annotated ECG image could not be generated.",
            AnalysisError::Config(_) => "The analysis service is misconfigured.",
        }
    }
}
