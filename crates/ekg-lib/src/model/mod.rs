//! Pre-trained normalizer + classifier, consumed as one versioned JSON bundle.
//!
//! The bundle is validated once at load time; afterwards it is read-only and
//! safe to share between concurrent analyses.

pub mod classifier;
pub mod scaler;

pub use classifier::{Classifier, DecisionTree, TreeNode};
pub use scaler::StandardScaler;

use crate::{
    error::{AnalysisError, AnalysisResult},
    metrics::{RRIntervalFeatureVector, FEATURE_COUNT, FEATURE_NAMES},
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maps class indices to diagnostic label strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub features: RRIntervalFeatureVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: String,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub scaler: StandardScaler,
    pub classifier: Classifier,
    pub labels: LabelEncoder,
}

impl ModelBundle {
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            AnalysisError::ModelUnavailable(format!("reading {}: {}", path.display(), err))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> AnalysisResult<Self> {
        let bundle: ModelBundle = serde_json::from_str(text)
            .map_err(|err| AnalysisError::ModelUnavailable(format!("parsing bundle: {}", err)))?;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        let unavailable = |msg: String| AnalysisError::ModelUnavailable(msg);
        if self.scaler.n_features() != FEATURE_COUNT {
            return Err(unavailable(format!(
                "scaler fitted on {} features, pipeline produces {}",
                self.scaler.n_features(),
                FEATURE_COUNT
            )));
        }
        self.scaler.validate().map_err(unavailable)?;
        if self.labels.is_empty() {
            return Err(unavailable("label encoder has no classes".into()));
        }
        self.classifier
            .validate(FEATURE_COUNT, self.labels.len())
            .map_err(unavailable)?;
        if let Some(names) = &self.feature_names {
            if names.len() != FEATURE_COUNT {
                return Err(unavailable(format!(
                    "bundle lists {} feature names, expected {}",
                    names.len(),
                    FEATURE_COUNT
                )));
            }
            if names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b) {
                warn!(
                    "model {} feature names {:?} differ from {:?}; assuming same order",
                    self.version, names, FEATURE_NAMES
                );
            }
        }
        Ok(())
    }

    pub fn normalize(&self, features: &[f64]) -> AnalysisResult<Vec<f64>> {
        self.scaler.normalize(features)
    }

    /// Label for an already-normalised feature vector.
    pub fn classify(&self, normalized: &[f64]) -> AnalysisResult<String> {
        if normalized.len() != FEATURE_COUNT {
            return Err(AnalysisError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: normalized.len(),
            });
        }
        let scores = self.classifier.decision_scores(normalized, self.labels.len());
        classifier::argmax(&scores)
            .and_then(|idx| self.labels.inverse_transform(idx))
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::ModelUnavailable("classifier produced no scores".into()))
    }

    /// Normalise then classify a raw feature vector.
    pub fn predict(&self, features: &RRIntervalFeatureVector) -> AnalysisResult<ClassificationResult> {
        let normalized = self.normalize(&features.to_array())?;
        let label = self.classify(&normalized)?;
        Ok(ClassificationResult {
            label,
            features: *features,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two-class bundle: a single stump on the normalised RR standard deviation.
    pub(crate) const STUMP_BUNDLE: &str = r#"{
        "version": "test-1",
        "feature_names": ["mean_rr","std_rr","min_rr","max_rr","median_rr","kurtosis_rr","skewness_rr","heart_rate"],
        "scaler": {
            "mean": [0.8, 0.05, 0.6, 1.0, 0.8, 0.0, 0.0, 75.0],
            "scale": [0.2, 0.05, 0.2, 0.3, 0.2, 1.0, 1.0, 15.0]
        },
        "classifier": {"kind": "forest", "trees": [{"nodes": [
            {"split": {"feature": 1, "threshold": 1.0, "left": 1, "right": 2}},
            {"leaf": {"value": [20, 1]}},
            {"leaf": {"value": [2, 30]}}
        ]}]},
        "labels": ["Normal", "Arrhythmia"]
    }"#;

    pub(crate) fn stump_bundle() -> ModelBundle {
        ModelBundle::from_json(STUMP_BUNDLE).unwrap()
    }

    #[test]
    fn regular_rhythm_is_labelled_normal() {
        let model = stump_bundle();
        let features = RRIntervalFeatureVector {
            mean_rr: 1.0,
            heart_rate: 60.0,
            min_rr: 1.0,
            max_rr: 1.0,
            median_rr: 1.0,
            ..RRIntervalFeatureVector::zeros()
        };
        let result = model.predict(&features).unwrap();
        assert_eq!(result.label, "Normal");
        assert_eq!(result.features, features);
    }

    #[test]
    fn high_variability_is_labelled_arrhythmia() {
        let model = stump_bundle();
        let features = RRIntervalFeatureVector {
            mean_rr: 0.8,
            std_rr: 0.25,
            ..RRIntervalFeatureVector::zeros()
        };
        assert_eq!(model.predict(&features).unwrap().label, "Arrhythmia");
    }

    #[test]
    fn zero_vector_is_classified_like_any_other() {
        let model = stump_bundle();
        let result = model.predict(&RRIntervalFeatureVector::zeros()).unwrap();
        assert_eq!(result.label, "Normal");
    }

    #[test]
    fn classification_is_deterministic() {
        let model = stump_bundle();
        let z = model.normalize(&[0.9, 0.12, 0.7, 1.1, 0.9, 0.3, -0.2, 66.0]).unwrap();
        let first = model.classify(&z).unwrap();
        for _ in 0..50 {
            assert_eq!(model.classify(&z).unwrap(), first);
        }
    }

    #[test]
    fn wrong_dimensionality_is_a_shape_mismatch() {
        let model = stump_bundle();
        assert!(matches!(
            model.classify(&[0.0; 7]),
            Err(AnalysisError::ShapeMismatch {
                expected: 8,
                actual: 7
            })
        ));
        assert!(matches!(
            model.normalize(&[0.0; 9]),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn bundle_with_wrong_class_count_is_unavailable() {
        let broken = STUMP_BUNDLE.replace(r#"["Normal", "Arrhythmia"]"#, r#"["Normal"]"#);
        let err = ModelBundle::from_json(&broken).unwrap_err();
        assert!(matches!(err, AnalysisError::ModelUnavailable(_)));
    }

    #[test]
    fn unreadable_bundle_is_unavailable() {
        let err = ModelBundle::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert_eq!(err.status(), 503);
        assert!(ModelBundle::from_json("{").is_err());
    }
}
