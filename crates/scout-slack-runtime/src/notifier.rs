//! Callback delivery and report translation.

use std::time::Duration;

use async_trait::async_trait;
use scout_ai::{CompletionClient, CompletionError, CompletionRequest};
use scout_report::{extract_structured, ExtractError, ExtractionContract, Locale, Report};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseVisibility {
    Ephemeral,
    InChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Slack `response_url` / slash command response payload.
pub struct OutboundMessage {
    pub response_type: ResponseVisibility,
    pub text: String,
}

/// The synchronous reply to a slash command.
pub type AckMessage = OutboundMessage;

impl OutboundMessage {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseVisibility::Ephemeral,
            text: text.into(),
        }
    }

    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseVisibility::InChannel,
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("failed to encode report for translation: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("translation request failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("translation response was unreadable: {0}")]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("callback request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("callback returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

#[async_trait]
/// Destination for the single outbound message of a command.
pub trait ResponseSink: Send + Sync {
    async fn deliver(
        &self,
        callback_url: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError>;
}

/// Posts messages as JSON to Slack `response_url` callbacks.
#[derive(Debug, Clone)]
pub struct HttpResponseSink {
    client: reqwest::Client,
}

impl HttpResponseSink {
    pub fn new(request_timeout_ms: u64) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ResponseSink for HttpResponseSink {
    async fn deliver(
        &self,
        callback_url: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let response = self.client.post(callback_url).json(message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = status.as_u16(), "callback delivered");
        Ok(())
    }
}

/// Translates `report` into `locale` with a secondary completion call.
///
/// The response goes through the same embedded-JSON extraction as the
/// research completion. The input report is left untouched.
pub async fn translate_report(
    client: &dyn CompletionClient,
    model: &str,
    contract: &ExtractionContract,
    report: &Report,
    locale: Locale,
) -> Result<Report, TranslationError> {
    let request = contract.translation_request(report, locale)?;
    let completion = client
        .complete(
            CompletionRequest::new(model, request.system_contract, request.user_directive)
                .with_json_mode(true),
        )
        .await?;
    Ok(extract_structured(&completion.text, contract.caps())?)
}
