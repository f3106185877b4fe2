pub mod ecg;

pub use ecg::{AnnotatedPeaks, BeatDetector, EcgPipelineConfig, PanTompkins};
