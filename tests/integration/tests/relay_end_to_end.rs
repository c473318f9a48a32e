use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use httpmock::prelude::*;
use scout_ai::{
    Completion, CompletionClient, CompletionError, CompletionRequest, CompletionUsage,
    GoogleClient, GoogleConfig,
};
use scout_report::{ExtractionContract, OutputShape};
use scout_slack_runtime::{
    build_relay_router, CommandHandler, CommandHandlerConfig, DeliveryError, HttpResponseSink,
    OutboundMessage, ResponseSink, ResponseVisibility, SLACK_COMMANDS_ENDPOINT,
};
use scout_store::{ReportStore, SqliteReportStore};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::sync::Mutex as AsyncMutex;
use tower::ServiceExt;

const MODEL: &str = "gemini-1.5-pro-latest";

struct ScriptedClient {
    responses: AsyncMutex<VecDeque<Result<String, CompletionError>>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: AsyncMutex::new(VecDeque::from(responses)),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, CompletionError> {
        let next = self.responses.lock().await.pop_front().unwrap_or_else(|| {
            Err(CompletionError::InvalidResponse(
                "scripted response queue exhausted".into(),
            ))
        });
        next.map(|text| Completion {
            text,
            finish_reason: Some("STOP".to_string()),
            usage: CompletionUsage::default(),
        })
    }
}

#[derive(Default)]
struct CollectingSink {
    messages: AsyncMutex<Vec<(String, OutboundMessage)>>,
}

#[async_trait]
impl ResponseSink for CollectingSink {
    async fn deliver(
        &self,
        callback_url: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        self.messages
            .lock()
            .await
            .push((callback_url.to_string(), message.clone()));
        Ok(())
    }
}

fn gemini_client(server: &MockServer) -> Arc<dyn CompletionClient> {
    Arc::new(
        GoogleClient::new(GoogleConfig {
            api_base: format!("{}/v1beta", server.base_url()),
            api_key: "test-google-key".to_string(),
            request_timeout_ms: 5_000,
            search_grounding: false,
        })
        .expect("gemini client"),
    )
}

fn relay_config() -> CommandHandlerConfig {
    CommandHandlerConfig {
        model: MODEL.to_string(),
        contract: ExtractionContract::new(OutputShape::Json),
        alternate_language_token: "english".to_string(),
    }
}

fn encode_form_value(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace(' ', "+")
}

fn slash_command_request(text: &str, response_url: &str) -> Request<Body> {
    let body = format!(
        "command=%2Fscout&user_id=U1&text={}&response_url={}",
        encode_form_value(text),
        encode_form_value(response_url)
    );
    Request::builder()
        .method("POST")
        .uri(SLACK_COMMANDS_ENDPOINT)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

async fn ack_body(response: axum::response::Response) -> Value {
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read ack body");
    serde_json::from_slice(&body).expect("ack json")
}

#[tokio::test]
async fn integration_command_persists_report_and_posts_rendered_markdown() {
    let provider = MockServer::start_async().await;
    let generate = provider.mock(|when, then| {
        when.method(POST)
            .path(format!("/v1beta/models/{MODEL}:generateContent"))
            .query_param("key", "test-google-key")
            .body_includes("https://example.com");
        then.status(200).json_body(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Claro, aquí está:\n```json\n{\"name\":\"Acme\",\"official_url\":\"https://example.com\",\"categories\":[\"Productivity\"],\"pricing\":\"Freemium\",\"web_match_percentage\":88}\n```"}]},
                "finishReason": "STOP"
            }]
        }));
    });
    let callbacks = MockServer::start_async().await;
    let callback = callbacks.mock(|when, then| {
        when.method(POST)
            .path("/commands/T1/100")
            .body_includes("\"response_type\":\"in_channel\"")
            .body_includes("Acme")
            .body_includes("• Productivity");
        then.status(200).body("ok");
    });

    let temp = tempdir().expect("tempdir");
    let store = Arc::new(
        SqliteReportStore::new(temp.path().join("reports.sqlite")).expect("sqlite store"),
    );
    let handler = Arc::new(CommandHandler::new(
        gemini_client(&provider),
        Some(store.clone() as Arc<dyn ReportStore>),
        Arc::new(HttpResponseSink::new(5_000).expect("sink")),
        relay_config(),
    ));
    let app = build_relay_router(Arc::clone(&handler));

    let response = app
        .oneshot(slash_command_request(
            "https://example.com",
            &callbacks.url("/commands/T1/100"),
        ))
        .await
        .expect("ack response");
    let ack = ack_body(response).await;
    assert_eq!(ack["response_type"], "ephemeral");

    handler.wait_idle().await;
    generate.assert();
    callback.assert();

    let record = store
        .get("https://example.com")
        .await
        .expect("read store")
        .expect("persisted record");
    assert_eq!(record.natural_key, "https://example.com");
    assert_eq!(record.report.name, "Acme");
    assert_eq!(record.report.web_match_percentage, 88.0);
}

#[tokio::test]
async fn integration_upstream_500_posts_ephemeral_error_and_skips_persistence() {
    let provider = MockServer::start_async().await;
    let generate = provider.mock(|when, then| {
        when.method(POST)
            .path(format!("/v1beta/models/{MODEL}:generateContent"));
        then.status(500).body("backend exploded");
    });
    let callbacks = MockServer::start_async().await;
    let error_callback = callbacks.mock(|when, then| {
        when.method(POST)
            .path("/commands/T1/200")
            .body_includes("\"response_type\":\"ephemeral\"")
            .body_includes("❌");
        then.status(200).body("ok");
    });

    let temp = tempdir().expect("tempdir");
    let store = Arc::new(
        SqliteReportStore::new(temp.path().join("reports.sqlite")).expect("sqlite store"),
    );
    let handler = Arc::new(CommandHandler::new(
        gemini_client(&provider),
        Some(store.clone() as Arc<dyn ReportStore>),
        Arc::new(HttpResponseSink::new(5_000).expect("sink")),
        relay_config(),
    ));
    let app = build_relay_router(Arc::clone(&handler));

    let response = app
        .oneshot(slash_command_request(
            "https://example.com",
            &callbacks.url("/commands/T1/200"),
        ))
        .await
        .expect("ack response");
    ack_body(response).await;

    handler.wait_idle().await;
    generate.assert_calls(1);
    error_callback.assert_calls(1);
    assert!(store
        .get("https://example.com")
        .await
        .expect("read store")
        .is_none());
}

#[tokio::test]
async fn integration_every_command_receives_exactly_one_message() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(r#"{"name":"Acme","official_url":"https://acme.example"}"#.to_string()),
        Err(CompletionError::HttpStatus {
            status: 502,
            body: "bad gateway".to_string(),
        }),
        Ok("no report today".to_string()),
        Ok(r#"{"name":"Beta","official_url":"N/A","categories":"N/A"}"#.to_string()),
    ]));
    let sink = Arc::new(CollectingSink::default());
    let handler = Arc::new(CommandHandler::new(
        client,
        None,
        sink.clone(),
        relay_config(),
    ));
    let app = build_relay_router(Arc::clone(&handler));

    for index in 0..4 {
        let response = app
            .clone()
            .oneshot(slash_command_request(
                &format!("https://tool-{index}.example"),
                &format!("https://hooks.slack.test/commands/{index}"),
            ))
            .await
            .expect("ack response");
        let ack = ack_body(response).await;
        assert_eq!(ack["response_type"], "ephemeral");
    }

    handler.wait_idle().await;
    let messages = sink.messages.lock().await.clone();
    assert_eq!(messages.len(), 4);
    for index in 0..4 {
        let url = format!("https://hooks.slack.test/commands/{index}");
        assert_eq!(
            messages.iter().filter(|(callback, _)| *callback == url).count(),
            1,
            "callback {url} should receive exactly one message"
        );
    }
    let ephemeral = messages
        .iter()
        .filter(|(_, message)| message.response_type == ResponseVisibility::Ephemeral)
        .count();
    assert_eq!(ephemeral, 2);
}

#[tokio::test]
async fn integration_store_keeps_single_row_across_repeated_research() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(
        SqliteReportStore::new(temp.path().join("reports.sqlite")).expect("sqlite store"),
    );
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(r#"{"name":"Acme","official_url":"https://example.com","pricing":"Free"}"#.to_string()),
        Ok(r#"{"name":"Acme","official_url":"https://example.com","pricing":"Paid"}"#.to_string()),
    ]));
    let handler = Arc::new(CommandHandler::new(
        client,
        Some(store.clone() as Arc<dyn ReportStore>),
        Arc::new(CollectingSink::default()),
        relay_config(),
    ));
    let app = build_relay_router(Arc::clone(&handler));

    let mut timestamps = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(slash_command_request(
                "https://example.com",
                "https://hooks.slack.test/commands/9",
            ))
            .await
            .expect("ack response");
        ack_body(response).await;
        handler.wait_idle().await;
        let record = store
            .get("https://example.com")
            .await
            .expect("read store")
            .expect("persisted");
        timestamps.push(record.last_processed_at);
    }

    let latest = store
        .get("https://example.com")
        .await
        .expect("read store")
        .expect("persisted");
    assert_eq!(latest.report.pricing, "Paid");
    assert!(timestamps[1] > timestamps[0]);
}
