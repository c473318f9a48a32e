use std::collections::VecDeque;

use async_trait::async_trait;
use scout_ai::{Completion, CompletionClient, CompletionError, CompletionRequest, CompletionUsage};
use scout_report::Report;
use scout_store::{PersistedRecord, ReportStore, StoreError, StoreResult};
use tokio::sync::Mutex;

use crate::notifier::{DeliveryError, OutboundMessage, ResponseSink};

pub(crate) struct ScriptedCompletionClient {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionClient {
    pub(crate) fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        self.requests.lock().await.push(request);
        let next = self.responses.lock().await.pop_front().unwrap_or_else(|| {
            Err(CompletionError::InvalidResponse(
                "scripted response queue exhausted".to_string(),
            ))
        });
        next.map(|text| Completion {
            text,
            finish_reason: Some("STOP".to_string()),
            usage: CompletionUsage::default(),
        })
    }
}

/// Completion client whose every call panics mid-research.
pub(crate) struct PanickingCompletionClient;

#[async_trait]
impl CompletionClient for PanickingCompletionClient {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, CompletionError> {
        panic!("completion client crashed")
    }
}

/// Store that rejects every write with a server error.
#[derive(Default)]
pub(crate) struct FailingStore {
    attempts: Mutex<Vec<String>>,
}

impl FailingStore {
    pub(crate) async fn attempts(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl ReportStore for FailingStore {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn upsert(&self, natural_key: &str, _report: &Report) -> StoreResult<PersistedRecord> {
        self.attempts.lock().await.push(natural_key.to_string());
        Err(StoreError::Server {
            status: 503,
            body: "database unavailable".to_string(),
        })
    }

    async fn get(&self, _natural_key: &str) -> StoreResult<Option<PersistedRecord>> {
        Ok(None)
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    delivered: Mutex<Vec<(String, OutboundMessage)>>,
    fail_with_status: Option<u16>,
}

impl RecordingSink {
    pub(crate) fn failing(status: u16) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail_with_status: Some(status),
        }
    }

    pub(crate) async fn delivered(&self) -> Vec<(String, OutboundMessage)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn deliver(
        &self,
        callback_url: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .await
            .push((callback_url.to_string(), message.clone()));
        match self.fail_with_status {
            Some(status) => Err(DeliveryError::Status {
                status,
                body: "rejected".to_string(),
            }),
            None => Ok(()),
        }
    }
}
