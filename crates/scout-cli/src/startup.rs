//! Startup wiring: resolves configuration once and injects it into the relay.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use scout_ai::{
    CompletionClient, GoogleClient, GoogleConfig, OpenAiClient, OpenAiConfig,
    DEFAULT_GOOGLE_API_BASE, DEFAULT_OPENAI_API_BASE,
};
use scout_report::ExtractionContract;
use scout_slack_runtime::{
    run_relay_server, CommandHandler, CommandHandlerConfig, HttpResponseSink,
};
use scout_store::{
    InMemoryReportStore, PostgrestConfig, PostgrestReportStore, ReportStore, SqliteReportStore,
};
use tracing::info;

use crate::cli_args::{Cli, CliProvider, CliStoreBackend};

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let handler = Arc::new(build_command_handler(&cli)?);
    run_relay_server(&cli.bind, handler).await
}

pub(crate) fn build_command_handler(cli: &Cli) -> Result<CommandHandler> {
    let client = build_completion_client(cli, |name| std::env::var(name).ok())?;
    let store = build_report_store(cli)?;
    let sink = HttpResponseSink::new(cli.callback_timeout_ms)
        .context("failed to construct callback http client")?;

    if cli.alternate_language_token.trim().is_empty() {
        bail!("--alternate-language-token cannot be empty");
    }

    Ok(CommandHandler::new(
        client,
        store,
        Arc::new(sink),
        CommandHandlerConfig {
            model: cli.model(),
            contract: ExtractionContract::new(cli.output_shape),
            alternate_language_token: cli.alternate_language_token.trim().to_string(),
        },
    ))
}

fn resolve_api_key(cli: &Cli, lookup_env: impl Fn(&str) -> Option<String>) -> Result<String> {
    let key = cli
        .api_key
        .clone()
        .or_else(|| lookup_env(cli.provider.api_key_env()))
        .map(|value| value.trim().to_string())
        .unwrap_or_default();
    if key.is_empty() {
        bail!(
            "missing provider API key: pass --api-key or set SCOUT_API_KEY or {}",
            cli.provider.api_key_env()
        );
    }
    Ok(key)
}

pub(crate) fn build_completion_client(
    cli: &Cli,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn CompletionClient>> {
    let api_key = resolve_api_key(cli, lookup_env)?;
    let api_base = cli
        .api_base
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let client: Arc<dyn CompletionClient> = match cli.provider {
        CliProvider::Google => Arc::new(
            GoogleClient::new(GoogleConfig {
                api_base: api_base.unwrap_or(DEFAULT_GOOGLE_API_BASE).to_string(),
                api_key,
                request_timeout_ms: cli.request_timeout_ms,
                search_grounding: cli.search_grounding,
            })
            .context("failed to construct gemini client")?,
        ),
        CliProvider::Openai => Arc::new(
            OpenAiClient::new(OpenAiConfig {
                api_base: api_base.unwrap_or(DEFAULT_OPENAI_API_BASE).to_string(),
                api_key,
                organization: cli.openai_organization.clone(),
                request_timeout_ms: cli.request_timeout_ms,
            })
            .context("failed to construct openai client")?,
        ),
    };
    Ok(client)
}

pub(crate) fn build_report_store(cli: &Cli) -> Result<Option<Arc<dyn ReportStore>>> {
    let store: Arc<dyn ReportStore> = match cli.store {
        CliStoreBackend::None => return Ok(None),
        CliStoreBackend::Memory => Arc::new(InMemoryReportStore::new()),
        CliStoreBackend::Sqlite => Arc::new(
            SqliteReportStore::new(&cli.sqlite_path).with_context(|| {
                format!(
                    "failed to open sqlite report store '{}'",
                    cli.sqlite_path.display()
                )
            })?,
        ),
        CliStoreBackend::Postgrest => {
            let Some(base_url) = non_empty(cli.postgrest_url.as_deref()) else {
                bail!("--postgrest-url is required when --store postgrest");
            };
            let Some(api_key) = non_empty(cli.postgrest_key.as_deref()) else {
                bail!("--postgrest-key is required when --store postgrest");
            };
            Arc::new(
                PostgrestReportStore::new(PostgrestConfig {
                    base_url,
                    api_key,
                    table: cli.postgrest_table.trim().to_string(),
                    request_timeout_ms: cli.callback_timeout_ms,
                })
                .context("failed to construct postgrest report store")?,
            )
        }
    };
    info!(backend = store.backend_name(), "report store ready");
    Ok(Some(store))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
