use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use ekg_lib::{
    context::{medical_context, PatientInfo},
    pipeline::{AnalysisResponse, Analyzer},
    AnalysisError,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Status code plus JSON body, mirroring an HTTP reply.
#[derive(Debug, Clone, Serialize)]
pub struct ToolReply {
    pub status: u16,
    pub body: Value,
}

impl ToolReply {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn analysis(status: u16, response: AnalysisResponse) -> Result<Self> {
        Ok(Self {
            status,
            body: serde_json::to_value(response)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalyzeParams {
    file_name: Option<String>,
    content_base64: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContextParams {
    patient: PatientInfo,
    ecg_label: Option<String>,
}

pub struct ToolRegistry {
    analyzer: Result<Arc<Analyzer>, AnalysisError>,
}

impl ToolRegistry {
    pub fn new(analyzer: Result<Arc<Analyzer>, AnalysisError>) -> Self {
        Self { analyzer }
    }

    pub fn supported_tools(&self) -> Vec<&'static str> {
        let mut tools = vec!["capabilities"];
        if self.analyzer.is_ok() {
            tools.push("analyze");
        }
        tools.push("medical_context");
        tools
    }

    pub fn execute(&self, tool: &str, params: Option<Value>) -> Result<ToolReply> {
        let params = params.unwrap_or_else(|| json!({}));
        match tool {
            "capabilities" => Ok(ToolReply::ok(json!({ "methods": self.supported_tools() }))),
            "analyze" => {
                let params: AnalyzeParams =
                    serde_json::from_value(params).context("parsing analyze params")?;
                self.analyze(params)
            }
            "medical_context" => {
                let params: ContextParams =
                    serde_json::from_value(params).context("parsing medical_context params")?;
                let text = medical_context(&params.patient, params.ecg_label.as_deref());
                Ok(ToolReply::ok(json!({ "context": text })))
            }
            _ => Err(anyhow!("unsupported tool {}", tool)),
        }
    }

    fn analyze(&self, params: AnalyzeParams) -> Result<ToolReply> {
        let analyzer = match &self.analyzer {
            Ok(analyzer) => analyzer,
            Err(err) => {
                let reason = match err {
                    AnalysisError::ModelUnavailable(reason) => reason.clone(),
                    other => other.to_string(),
                };
                let err = AnalysisError::ModelUnavailable(reason);
                return ToolReply::analysis(err.status(), AnalysisResponse::from_error(&err));
            }
        };
        let Some(content) = params.content_base64 else {
            return ToolReply::analysis(
                400,
                AnalysisResponse::failure("No file part", "No file part"),
            );
        };
        let file_name = params.file_name.unwrap_or_default();
        if file_name.trim().is_empty() {
            return ToolReply::analysis(
                400,
                AnalysisResponse::failure("No selected file", "No selected file"),
            );
        }
        let table = match general_purpose::STANDARD.decode(content.trim()) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("rejecting {}: {}", file_name, err);
                let err =
                    AnalysisError::MalformedInput(format!("file content is not base64: {}", err));
                return ToolReply::analysis(err.status(), AnalysisResponse::from_error(&err));
            }
        };

        info!("analysing {} ({} bytes)", file_name, table.len());
        let result = analyzer.analyze_bytes(&table);
        if let Err(err) = &result {
            warn!("analysis of {} failed: {}", file_name, err);
        }
        let (status, body) = AnalysisResponse::from_result(&result);
        ToolReply::analysis(status, body)
    }

    pub fn log_summary(&self) {
        info!("Registered tools: {:?}", self.supported_tools());
        if let Ok(analyzer) = &self.analyzer {
            let model = analyzer.model();
            info!(
                "Model {} with classes {:?}",
                model.version,
                model.labels.classes()
            );
        }
    }
}
