use crate::{
    artifact::ArtifactStore,
    detectors::EcgPipelineConfig,
    error::{AnalysisError, AnalysisResult},
    io::table::{WaveformIngestor, DEFAULT_LEAD_COLUMN, DEFAULT_SAMPLING_RATE_HZ},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Deployment settings, read from TOML. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub sampling_rate_hz: f64,
    pub lead_column: String,
    pub model_path: Option<PathBuf>,
    pub artifact_dir: PathBuf,
    pub artifact_url_prefix: String,
    pub max_plot_points: usize,
    pub detector: EcgPipelineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            lead_column: DEFAULT_LEAD_COLUMN.into(),
            model_path: None,
            artifact_dir: PathBuf::from("static/ecg"),
            artifact_url_prefix: "/static/ecg".into(),
            max_plot_points: 4000,
            detector: EcgPipelineConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml(text: &str) -> AnalysisResult<Self> {
        let cfg: ServiceConfig =
            toml::from_str(text).map_err(|err| AnalysisError::Config(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            AnalysisError::Config(format!("reading {}: {}", path.display(), err))
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if !self.sampling_rate_hz.is_finite() || self.sampling_rate_hz <= 0.0 {
            return Err(AnalysisError::Config(format!(
                "sampling_rate_hz must be positive, got {}",
                self.sampling_rate_hz
            )));
        }
        if self.lead_column.is_empty() {
            return Err(AnalysisError::Config("lead_column must not be empty".into()));
        }
        Ok(())
    }

    pub fn ingestor(&self) -> WaveformIngestor {
        WaveformIngestor::new(self.lead_column.clone(), self.sampling_rate_hz)
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(self.artifact_dir.clone(), self.artifact_url_prefix.clone())
            .with_max_points(self.max_plot_points)
    }
}
