use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{error, info};

use super::{
    AnalysisError, AnalysisRequest, HealthAnalyzer,
    prompt::{SYSTEM_INSTRUCTION, build_prompt},
    schema::response_schema,
};
use crate::{config::ServiceConfig, models::HealthAnalysis};

/// Analysis client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiAnalyzer {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
    temperature: f32,
}

impl GeminiAnalyzer {
    pub fn new(config: &ServiceConfig) -> Result<Self, AnalysisError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(AnalysisError::MissingCredentials)?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    fn request_body(&self, request: &AnalysisRequest) -> Value {
        let mut parts = vec![json!({ "text": build_prompt(request) })];
        if let Some(file) = &request.file {
            parts.push(json!({
                "inlineData": {
                    "mimeType": file.mime_type,
                    "data": file.data
                }
            }));
        }

        json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
                "temperature": self.temperature
            }
        })
    }
}

#[async_trait]
impl HealthAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<HealthAnalysis, AnalysisError> {
        info!(
            model = %self.model,
            follow_up = request.is_follow_up(),
            has_file = request.file.is_some(),
            "Requesting health analysis"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Analysis request failed");
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        let text = response_text(&payload).ok_or(AnalysisError::EmptyResponse)?;
        let analysis: HealthAnalysis = serde_json::from_str(text.trim())?;

        info!(
            risk = %analysis.risk_score,
            is_final = analysis.is_final_report,
            conditions = analysis.conditions.len(),
            "Health analysis received"
        );
        Ok(analysis)
    }
}

/// Concatenated text parts of the first candidate, if there is any text at all.
fn response_text(payload: &Value) -> Option<String> {
    let text: String = payload["candidates"][0]["content"]["parts"]
        .as_array()?
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    (!text.trim().is_empty()).then_some(text)
}
