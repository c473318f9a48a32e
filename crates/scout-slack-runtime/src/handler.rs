//! Command orchestration: synchronous ack, then one detached research
//! continuation per command.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use scout_ai::{CompletionClient, CompletionError, CompletionRequest};
use scout_report::{
    extract_report, render_extracted, render_report, truncate_for_slack, ExtractError,
    ExtractionContract, Locale, OutputShape, Report,
};
use scout_store::{ReportStore, StoreError};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::command::Command;
use crate::notifier::{translate_report, AckMessage, DeliveryError, OutboundMessage, ResponseSink};
use crate::tasks::BackgroundTasks;

const ERROR_DETAIL_MAX_CHARS: usize = 600;

#[derive(Debug, Error)]
/// Failure of one stage of the research pipeline.
pub enum RelayError {
    #[error("completion service failed: {0}")]
    Upstream(#[source] CompletionError),
    #[error("completion output was malformed: {0}")]
    MalformedOutput(#[source] ExtractError),
    #[error("report persistence failed: {0}")]
    Persistence(#[source] StoreError),
    #[error("report delivery failed: {0}")]
    Delivery(#[source] DeliveryError),
    #[error("continuation aborted: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream(source) => source.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandHandlerConfig {
    pub model: String,
    pub contract: ExtractionContract,
    pub alternate_language_token: String,
}

/// Immutable collaborators shared by every continuation.
struct Pipeline {
    client: Arc<dyn CompletionClient>,
    store: Option<Arc<dyn ReportStore>>,
    sink: Arc<dyn ResponseSink>,
    config: CommandHandlerConfig,
}

pub struct CommandHandler {
    pipeline: Arc<Pipeline>,
    tasks: BackgroundTasks,
    next_command_id: AtomicU64,
}

impl CommandHandler {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        store: Option<Arc<dyn ReportStore>>,
        sink: Arc<dyn ResponseSink>,
        config: CommandHandlerConfig,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                client,
                store,
                sink,
                config,
            }),
            tasks: BackgroundTasks::new(),
            next_command_id: AtomicU64::new(1),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.pipeline.client.provider_name()
    }

    pub fn model(&self) -> &str {
        &self.pipeline.config.model
    }

    pub fn output_shape(&self) -> OutputShape {
        self.pipeline.config.contract.shape()
    }

    pub fn store_backend(&self) -> &'static str {
        self.pipeline
            .store
            .as_ref()
            .map(|store| store.backend_name())
            .unwrap_or("none")
    }

    pub fn alternate_language_token(&self) -> &str {
        &self.pipeline.config.alternate_language_token
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Returns the ack immediately and runs the research in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn handle(&self, command: Command) -> AckMessage {
        let command_id = format!(
            "cmd-{}",
            self.next_command_id.fetch_add(1, Ordering::Relaxed)
        );
        info!(
            command_id = %command_id,
            subject = %command.subject,
            locale = command.locale.as_str(),
            user_id = command.user_id.as_deref().unwrap_or("-"),
            "slash command accepted"
        );

        let ack = OutboundMessage::ephemeral(
            command
                .locale
                .ack_text(self.provider_name(), &self.pipeline.config.model),
        );
        let pipeline = Arc::clone(&self.pipeline);
        self.tasks
            .spawn(async move { pipeline.run_continuation(command_id, command).await });
        ack
    }

    /// Waits for every in-flight continuation.
    pub async fn wait_idle(&self) {
        self.tasks.wait_idle().await;
    }
}

impl Pipeline {
    async fn run_continuation(self: Arc<Self>, command_id: String, command: Command) {
        // Research runs in its own task so a panic still yields a failure message.
        let pipeline = Arc::clone(&self);
        let research_command = command.clone();
        let research_id = command_id.clone();
        let outcome = match tokio::spawn(async move {
            pipeline.research(&research_id, &research_command).await
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(join_error) => Err(RelayError::Internal(join_error.to_string())),
        };

        let message = match outcome {
            Ok(text) => OutboundMessage::in_channel(text),
            Err(relay_error) => {
                error!(
                    command_id = %command_id,
                    subject = %command.subject,
                    upstream_status = ?relay_error.upstream_status(),
                    error = %relay_error,
                    "research continuation failed"
                );
                OutboundMessage::ephemeral(self.failure_text(command.locale, &relay_error))
            }
        };

        match self.sink.deliver(&command.callback_url, &message).await {
            Ok(()) => info!(
                command_id = %command_id,
                response_type = ?message.response_type,
                chars = message.text.chars().count(),
                "command response delivered"
            ),
            Err(delivery_error) => error!(
                command_id = %command_id,
                error = %RelayError::Delivery(delivery_error),
                "command response could not be delivered"
            ),
        }
    }

    async fn research(&self, command_id: &str, command: &Command) -> Result<String, RelayError> {
        let contract = &self.config.contract;
        let request = contract.build_request(&command.subject, command.locale);
        let completion = self
            .client
            .complete(
                CompletionRequest::new(
                    self.config.model.as_str(),
                    request.system_contract,
                    request.user_directive,
                )
                .with_json_mode(contract.shape() == OutputShape::Json),
            )
            .await
            .map_err(RelayError::Upstream)?;

        let extracted =
            extract_report(&completion.text, contract).map_err(RelayError::MalformedOutput)?;
        let Some(report) = extracted.as_structured() else {
            return Ok(render_extracted(&extracted, command.locale));
        };

        self.persist(command_id, command, report).await;

        if command.locale.is_default() {
            return Ok(render_report(report, command.locale));
        }
        let translated = translate_report(
            self.client.as_ref(),
            &self.config.model,
            contract,
            report,
            command.locale,
        )
        .await
        .map_err(|error| RelayError::Delivery(DeliveryError::Translation(error)))?;
        Ok(render_report(&translated, command.locale))
    }

    async fn persist(&self, command_id: &str, command: &Command, report: &Report) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let key = natural_key(report, &command.subject);
        match store.upsert(&key, report).await {
            Ok(record) => info!(
                command_id = %command_id,
                natural_key = %record.natural_key,
                backend = store.backend_name(),
                "report persisted"
            ),
            Err(store_error) => warn!(
                command_id = %command_id,
                natural_key = %key,
                backend = store.backend_name(),
                error = %RelayError::Persistence(store_error),
                "report persistence failed; continuing to delivery"
            ),
        }
    }

    fn failure_text(&self, locale: Locale, relay_error: &RelayError) -> String {
        let provider = self.client.provider_name();
        match relay_error {
            RelayError::Upstream(source) => locale.upstream_failure_text(
                provider,
                &truncate_for_slack(&source.to_string(), ERROR_DETAIL_MAX_CHARS),
            ),
            RelayError::MalformedOutput(source) => locale.malformed_failure_text(
                provider,
                &truncate_for_slack(&source.to_string(), ERROR_DETAIL_MAX_CHARS),
            ),
            RelayError::Internal(detail) => locale.internal_failure_text(&truncate_for_slack(
                detail,
                ERROR_DETAIL_MAX_CHARS,
            )),
            RelayError::Persistence(_) | RelayError::Delivery(_) => {
                locale.delivery_failure_text(&truncate_for_slack(
                    &relay_error.to_string(),
                    ERROR_DETAIL_MAX_CHARS,
                ))
            }
        }
    }
}

/// Persistence key for `report`: its official URL, or the researched subject
/// when the URL is unknown.
pub fn natural_key(report: &Report, subject: &str) -> String {
    if report.has_official_url() {
        report.official_url.trim().to_string()
    } else {
        subject.trim().to_string()
    }
}
