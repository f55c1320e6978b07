//! Extraction through the Gemini `generateContent` API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::error::{DocustackError, ExtractionError};
use crate::sanitize;
use crate::secrets;

use super::client::{ExtractionRequest, Extractor};
use super::data::ExtractedData;

/// Instructions sent with every document unless the config overrides them.
pub const DEFAULT_PROMPT: &str = r#"You are a document data extraction engine.
Read the attached document and reply with a single JSON object, no prose, with this shape:
{
  "summary": "one or two sentences describing the document",
  "metadata": {
    "name": "customer or vendor name",
    "date": "document date exactly as printed",
    "total": "subtotal or base total exactly as printed",
    "grandTotal": "final amount exactly as printed"
  },
  "headers": ["column labels of the main line-item table, in order"],
  "rows": [{"<header>": "cell value"}]
}
Use an empty string for any field that is not present. Every row must use the header labels as keys."#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Calls a Gemini model with the document inlined as base64 data.
pub struct GeminiExtractor {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
    prompt: String,
}

impl GeminiExtractor {
    pub fn new(config: &ExtractorConfig, api_key: SecretString) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            prompt: config
                .prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        })
    }

    /// Builds an extractor, resolving the API key from the configured sources.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, DocustackError> {
        let api_key = secrets::resolve_api_key(config)?;
        if api_key.expose_secret().is_empty() {
            return Err(ExtractionError::MissingApiKey.into());
        }
        Ok(Self::new(config, api_key)?)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(&self, request: &ExtractionRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": request.media_type,
                            "data": request.encoded_content,
                        }
                    },
                    { "text": format!("{}\n\nFile name: {}", self.prompt, request.file_name) }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.1
            }
        })
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedData, ExtractionError> {
        debug!(
            file_name = %request.file_name,
            model = %self.model,
            encoded_len = request.encoded_content.len(),
            "Sending document to extraction service"
        );

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.request_body(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                file_name = %request.file_name,
                "Extraction service returned an error"
            );
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        parse_response(&body, &request.file_name)
    }
}

/// Extracts the service's own error message, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => sanitize::truncate_body(body),
    }
}

/// Parses a `generateContent` response body into extracted data.
fn parse_response(body: &str, file_name: &str) -> Result<ExtractedData, ExtractionError> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        ExtractionError::InvalidResponse(format!("malformed service response: {}", e))
    })?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(ExtractionError::InvalidResponse(format!(
            "document was blocked: {}",
            reason
        )));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| ExtractionError::InvalidResponse("no candidates returned".to_string()))?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(ExtractionError::InvalidResponse(format!(
            "empty response (finish reason: {})",
            reason
        )));
    }

    let mut data: ExtractedData = serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| ExtractionError::InvalidResponse(format!("response is not valid JSON: {}", e)))?;
    data.source_file_name = file_name.to_string();

    Ok(data)
}

/// Strips a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
