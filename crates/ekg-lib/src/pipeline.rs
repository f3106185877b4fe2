//! End-to-end analysis: ingest → detect → features → normalise → classify,
//! with the review image rendered alongside classification.

use crate::{
    artifact::{ArtifactRef, ArtifactStore},
    config::ServiceConfig,
    detectors::{BeatDetector, PanTompkins},
    error::{AnalysisError, AnalysisResult},
    io::table::WaveformIngestor,
    metrics::extract_features,
    model::{ClassificationResult, ModelBundle},
    signal::{RPeakSet, TimeSeries},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything one analysis run produced. Owned by the caller; nothing is shared
/// with other runs except the read-only model.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub sample_count: usize,
    pub fs: f64,
    pub peaks: RPeakSet,
    pub classification: ClassificationResult,
    pub artifact: ArtifactRef,
}

pub struct Analyzer {
    ingestor: WaveformIngestor,
    detector: Box<dyn BeatDetector>,
    model: Arc<ModelBundle>,
    store: ArtifactStore,
}

impl Analyzer {
    pub fn new(config: &ServiceConfig, model: Arc<ModelBundle>) -> Self {
        Self {
            ingestor: config.ingestor(),
            detector: Box::new(PanTompkins::new(config.detector)),
            model,
            store: config.artifact_store(),
        }
    }

    /// Validate the configuration and load the model it points at.
    pub fn from_config(config: &ServiceConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let path = config.model_path.as_deref().ok_or_else(|| {
            AnalysisError::ModelUnavailable("no model_path configured".into())
        })?;
        let model = ModelBundle::load(path)?;
        info!(
            "loaded model {} ({} classes) from {}",
            model.version,
            model.labels.len(),
            path.display()
        );
        Ok(Self::new(config, Arc::new(model)))
    }

    pub fn with_detector(mut self, detector: Box<dyn BeatDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = store;
        self
    }

    pub fn model(&self) -> &ModelBundle {
        &self.model
    }

    pub fn ingestor(&self) -> &WaveformIngestor {
        &self.ingestor
    }

    pub fn analyze_bytes(&self, table: &[u8]) -> AnalysisResult<AnalysisOutcome> {
        let ts = self.ingestor.read_bytes(table)?;
        self.analyze_series(&ts)
    }

    pub fn analyze_series(&self, ts: &TimeSeries) -> AnalysisResult<AnalysisOutcome> {
        let peaks = self.detector.detect(ts)?;
        if peaks.len() < 2 {
            warn!(
                "only {} R-peak(s) in {} samples; classifying the all-zero feature vector",
                peaks.len(),
                ts.len()
            );
        }
        let features = extract_features(ts, &peaks);

        let (classification, artifact) = std::thread::scope(|scope| {
            let render = scope.spawn(|| self.store.render(ts, &peaks));
            let classification = self.model.predict(&features);
            let artifact = render.join().unwrap_or_else(|_| {
                Err(AnalysisError::Artifact("renderer panicked".into()))
            });
            (classification, artifact)
        });
        let classification = match classification {
            Ok(classification) => classification,
            Err(err) => {
                if let Ok(artifact) = &artifact {
                    self.store.discard(artifact);
                }
                return Err(err);
            }
        };
        let artifact = artifact?;

        info!(
            "classified {} samples ({} beats, {:.1} bpm) as '{}' -> {}",
            ts.len(),
            peaks.len(),
            features.heart_rate,
            classification.label,
            artifact.url
        );
        Ok(AnalysisOutcome {
            sample_count: ts.len(),
            fs: ts.fs(),
            peaks,
            classification,
            artifact,
        })
    }
}

/// Response contract handed to the serving layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    pub fn success(outcome: &AnalysisOutcome) -> Self {
        Self {
            success: true,
            prediction: Some(outcome.classification.label.clone()),
            image_path: Some(outcome.artifact.url.clone()),
            message: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            prediction: None,
            image_path: None,
            message: Some(message.into()),
            error: Some(error.into()),
        }
    }

    pub fn from_error(err: &AnalysisError) -> Self {
        Self::failure(err.summary(), err.to_string())
    }

    /// Status code and body for a finished run.
    pub fn from_result(result: &AnalysisResult<AnalysisOutcome>) -> (u16, Self) {
        match result {
            Ok(outcome) => (200, Self::success(outcome)),
            Err(err) => (err.status(), Self::from_error(err)),
        }
    }
}
