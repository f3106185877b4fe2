pub mod artifact;
pub mod config;
pub mod context;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod plot;
pub mod signal;

pub use detectors::*;
pub use error::{AnalysisError, AnalysisResult};
pub use metrics::*;
pub use signal::*;
