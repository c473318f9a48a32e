use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{Completion, CompletionClient, CompletionError, CompletionRequest, CompletionUsage};

pub const DEFAULT_GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
/// Connection settings for the Gemini `generateContent` API.
pub struct GoogleConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    /// Attach the `google_search` tool so the model can research live sources.
    pub search_grounding: bool,
}

#[derive(Debug, Clone)]
pub struct GoogleClient {
    client: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, CompletionError> {
        if config.api_key.trim().is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn generate_content_url(&self, model: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.contains(":generateContent") {
            return base.replace("{model}", model);
        }

        format!("{base}/models/{model}:generateContent")
    }
}

#[async_trait]
impl CompletionClient for GoogleClient {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let url = self.generate_content_url(&request.model);
        let body = build_generate_content_body(&request, self.config.search_grounding);
        debug!(model = %request.model, json_mode = request.json_mode, "sending generateContent");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.trim())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        parse_generate_content_response(&raw)
    }
}

fn build_generate_content_body(request: &CompletionRequest, search_grounding: bool) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }],
        }],
    });

    if !request.system.trim().is_empty() {
        body["systemInstruction"] = json!({
            "parts": [{ "text": request.system }],
        });
    }

    if search_grounding {
        body["tools"] = json!([{ "google_search": {} }]);
    }

    // Gemini rejects responseMimeType together with the search tool.
    let json_mode = request.json_mode && !search_grounding;
    if request.temperature.is_some() || request.max_tokens.is_some() || json_mode {
        let mut generation_config = json!({});
        if json_mode {
            generation_config["responseMimeType"] = json!("application/json");
        }
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        body["generationConfig"] = generation_config;
    }

    body
}

fn parse_generate_content_response(raw: &str) -> Result<Completion, CompletionError> {
    let parsed: GenerateContentResponse = serde_json::from_str(raw)?;
    let candidate = parsed
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or_else(|| {
            CompletionError::InvalidResponse("response contained no candidates".to_string())
        })?;

    let text = candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(CompletionError::InvalidResponse(format!(
            "candidate contained no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let usage = parsed
        .usage_metadata
        .map(|usage| CompletionUsage {
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
            total_tokens: usage.total_token_count.unwrap_or(0),
        })
        .unwrap_or_default();

    Ok(Completion {
        text,
        finish_reason: candidate.finish_reason,
        usage,
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<GenerateContentCandidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GenerateContentUsage>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentCandidate {
    content: Option<GenerateContentContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentContent {
    parts: Option<Vec<GenerateContentPart>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u64>,
}
