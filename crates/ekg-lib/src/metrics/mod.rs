pub mod rr;

pub use rr::{extract_features, RRIntervalFeatureVector, FEATURE_COUNT, FEATURE_NAMES};
