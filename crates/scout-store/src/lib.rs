//! Report persistence keyed by the analyzed resource's natural key.
//!
//! Every backend upserts: one row per natural key, overwritten on each run,
//! with a refreshed `last_processed_at`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use scout_report::Report;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

mod postgrest;
mod sqlite;

pub use postgrest::{PostgrestConfig, PostgrestReportStore};
pub use sqlite::SqliteReportStore;

/// Result type for report store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("natural key must not be empty")]
    EmptyKey,
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
    #[error("store returned no row for '{0}'")]
    MissingRow(String),
    #[error("store returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("store http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A stored report row.
pub struct PersistedRecord {
    pub natural_key: String,
    #[serde(flatten)]
    pub report: Report,
    pub last_processed_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Creates or overwrites the row for `natural_key`.
    async fn upsert(&self, natural_key: &str, report: &Report) -> StoreResult<PersistedRecord>;

    async fn get(&self, natural_key: &str) -> StoreResult<Option<PersistedRecord>>;
}

/// Timestamp for a new write that never goes backwards relative to the
/// previous write of the same key.
pub fn next_processed_at(
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match previous {
        Some(previous) if previous >= now => previous + Duration::microseconds(1),
        _ => now,
    }
}

pub(crate) fn normalize_key(natural_key: &str) -> StoreResult<String> {
    let trimmed = natural_key.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(trimmed.to_string())
}

/// Process-local store used by tests and `--store memory`.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    records: RwLock<HashMap<String, PersistedRecord>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, natural_key: &str, report: &Report) -> StoreResult<PersistedRecord> {
        let natural_key = normalize_key(natural_key)?;
        let mut records = self.records.write().await;
        let previous = records
            .get(&natural_key)
            .map(|record| record.last_processed_at);
        let record = PersistedRecord {
            natural_key: natural_key.clone(),
            report: report.clone(),
            last_processed_at: next_processed_at(previous, Utc::now()),
        };
        records.insert(natural_key, record.clone());
        Ok(record)
    }

    async fn get(&self, natural_key: &str) -> StoreResult<Option<PersistedRecord>> {
        let natural_key = normalize_key(natural_key)?;
        Ok(self.records.read().await.get(&natural_key).cloned())
    }
}
