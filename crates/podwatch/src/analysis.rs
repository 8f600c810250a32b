//! Root-cause analysis through a text-generation endpoint.
//!
//! The evidence is flattened into a single prompt and sent to an
//! Ollama-compatible `/api/generate` endpoint with streaming disabled.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::evidence::EvidenceBundle;

/// Default inference endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3";

/// Returned when the model answered without a `response` field.
pub const FALLBACK_RESPONSE: &str = "No response from model";

const PROMPT_PREAMBLE: &str = "Here are the logs and events from a Kubernetes pod. \
Help me identify the issue and suggest a fix.";

/// Produces a natural-language analysis of an incident's evidence.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, evidence: &EvidenceBundle) -> Result<String, AnalysisError>;
}

/// Build the prompt sent to the model.
pub fn build_prompt(evidence: &EvidenceBundle) -> String {
    let event_lines = evidence
        .events
        .iter()
        .map(|e| format!("- {}: {}", e.reason, e.message))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{PROMPT_PREAMBLE}\n\nEvents:\n{event_lines}\n\nLogs:\n{}",
        evidence.logs
    )
}

/// Extract the `response` text from a generate reply body.
///
/// Invalid JSON is an error; valid JSON without a string `response` falls
/// back to [`FALLBACK_RESPONSE`].
pub fn parse_response(body: &str) -> Result<String, AnalysisError> {
    let parsed: serde_json::Value = serde_json::from_str(body)?;
    match parsed.get("response").and_then(serde_json::Value::as_str) {
        Some(text) => Ok(text.to_string()),
        None => {
            warn!("Model reply had no response field, using fallback");
            Ok(FALLBACK_RESPONSE.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// [`Analyzer`] calling an Ollama `/api/generate` endpoint.
pub struct OllamaAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaAnalyzer {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Analyzer for OllamaAnalyzer {
    async fn analyze(&self, evidence: &EvidenceBundle) -> Result<String, AnalysisError> {
        let prompt = build_prompt(evidence);
        let request = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
        };

        debug!(
            model = %self.model,
            prompt_bytes = prompt.len(),
            "Requesting analysis"
        );

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, "Inference endpoint returned non-success status");
        }

        parse_response(&body)
    }
}
