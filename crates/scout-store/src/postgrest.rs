//! PostgREST-backed `ReportStore` (Supabase-style REST table).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use scout_report::Report;
use serde::Serialize;
use tracing::debug;

use crate::{normalize_key, PersistedRecord, ReportStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub request_timeout_ms: u64,
}

impl PostgrestConfig {
    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table.trim()
        )
    }
}

/// Upserts rows through PostgREST's `on_conflict` merge.
///
/// `merge-duplicates` only rewrites the columns present in the body, so every
/// upsert carries a fresh `last_processed_at`.
#[derive(Debug, Clone)]
pub struct PostgrestReportStore {
    client: reqwest::Client,
    config: PostgrestConfig,
}

#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    natural_key: &'a str,
    #[serde(flatten)]
    report: &'a Report,
    last_processed_at: DateTime<Utc>,
}

impl PostgrestReportStore {
    pub fn new(config: PostgrestConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.api_key.trim())
                .map_err(|error| StoreError::InvalidConfig(format!("api key header: {error}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
                .map_err(|error| StoreError::InvalidConfig(format!("authorization header: {error}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ReportStore for PostgrestReportStore {
    fn backend_name(&self) -> &'static str {
        "postgrest"
    }

    async fn upsert(&self, natural_key: &str, report: &Report) -> StoreResult<PersistedRecord> {
        let natural_key = normalize_key(natural_key)?;
        let body = [UpsertRow {
            natural_key: &natural_key,
            report,
            last_processed_at: Utc::now(),
        }];

        let response = self
            .client
            .post(self.config.table_url())
            .query(&[("on_conflict", "natural_key")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&body)
            .send()
            .await?;
        let rows = read_rows(response).await?;
        debug!(natural_key = %natural_key, table = %self.config.table, "postgrest report upserted");

        rows.into_iter()
            .next()
            .ok_or(StoreError::MissingRow(natural_key))
    }

    async fn get(&self, natural_key: &str) -> StoreResult<Option<PersistedRecord>> {
        let natural_key = normalize_key(natural_key)?;
        let filter = format!("eq.{natural_key}");
        let response = self
            .client
            .get(self.config.table_url())
            .query(&[
                ("natural_key", filter.as_str()),
                ("select", "*"),
                ("limit", "1"),
            ])
            .send()
            .await?;
        Ok(read_rows(response).await?.into_iter().next())
    }
}

async fn read_rows(response: reqwest::Response) -> StoreResult<Vec<PersistedRecord>> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(StoreError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}
