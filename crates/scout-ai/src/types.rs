use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A single-turn prompt sent to a completion provider.
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub json_mode: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            prompt: prompt.into(),
            json_mode: false,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CompletionUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Raw text returned by a provider. The text is opaque to this crate.
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: CompletionUsage,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Upstream status code when the provider answered with a non-success status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Http(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

#[async_trait]
/// Black-box text completion service.
pub trait CompletionClient: Send + Sync {
    /// Provider label used in logs and user-facing status text.
    fn provider_name(&self) -> &'static str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;
}
