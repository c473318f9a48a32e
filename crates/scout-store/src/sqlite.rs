//! SQLite-backed `ReportStore` with one row per natural key.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use scout_report::{Alternative, Report};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{next_processed_at, normalize_key, PersistedRecord, ReportStore, StoreResult};

/// Persistent SQLite report store.
#[derive(Debug)]
pub struct SqliteReportStore {
    db_path: PathBuf,
}

impl SqliteReportStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        let connection = store.open_connection()?;
        initialize_schema(&connection)?;
        Ok(store)
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(connection)
    }
}

fn initialize_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tool_reports (
            natural_key TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            official_url TEXT NOT NULL,
            short_description TEXT NOT NULL,
            categories_json TEXT NOT NULL,
            target_audience_json TEXT NOT NULL,
            key_features_json TEXT NOT NULL,
            pricing TEXT NOT NULL,
            alternatives_json TEXT NOT NULL,
            pros_json TEXT NOT NULL,
            cons_json TEXT NOT NULL,
            web_match_percentage REAL NOT NULL,
            methodology TEXT NOT NULL,
            last_processed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tool_reports_processed
            ON tool_reports (last_processed_at DESC);
        "#,
    )?;
    Ok(())
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(&self, natural_key: &str, report: &Report) -> StoreResult<PersistedRecord> {
        let natural_key = normalize_key(natural_key)?;
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous = transaction
            .query_row(
                "SELECT last_processed_at FROM tool_reports WHERE natural_key = ?1",
                params![natural_key],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|raw| timestamp_from_db(&raw))
            .transpose()?;
        let last_processed_at = next_processed_at(previous, Utc::now());

        transaction.execute(
            r#"
            INSERT INTO tool_reports (
                natural_key, name, official_url, short_description,
                categories_json, target_audience_json, key_features_json, pricing,
                alternatives_json, pros_json, cons_json, web_match_percentage,
                methodology, last_processed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(natural_key) DO UPDATE SET
                name = excluded.name,
                official_url = excluded.official_url,
                short_description = excluded.short_description,
                categories_json = excluded.categories_json,
                target_audience_json = excluded.target_audience_json,
                key_features_json = excluded.key_features_json,
                pricing = excluded.pricing,
                alternatives_json = excluded.alternatives_json,
                pros_json = excluded.pros_json,
                cons_json = excluded.cons_json,
                web_match_percentage = excluded.web_match_percentage,
                methodology = excluded.methodology,
                last_processed_at = excluded.last_processed_at
            "#,
            params![
                natural_key,
                report.name,
                report.official_url,
                report.short_description,
                serialize_json(&report.categories)?,
                serialize_json(&report.target_audience)?,
                serialize_json(&report.key_features)?,
                report.pricing,
                serialize_json(&report.alternatives)?,
                serialize_json(&report.pros)?,
                serialize_json(&report.cons)?,
                report.web_match_percentage,
                report.methodology,
                timestamp_to_db(last_processed_at),
            ],
        )?;
        transaction.commit()?;
        debug!(natural_key = %natural_key, "sqlite report upserted");

        Ok(PersistedRecord {
            natural_key,
            report: report.clone(),
            last_processed_at,
        })
    }

    async fn get(&self, natural_key: &str) -> StoreResult<Option<PersistedRecord>> {
        let natural_key = normalize_key(natural_key)?;
        let connection = self.open_connection()?;
        let row = connection
            .query_row(
                r#"
                SELECT natural_key, name, official_url, short_description,
                       categories_json, target_audience_json, key_features_json, pricing,
                       alternatives_json, pros_json, cons_json, web_match_percentage,
                       methodology, last_processed_at
                FROM tool_reports WHERE natural_key = ?1
                "#,
                params![natural_key],
                |row| {
                    Ok(StoredRow {
                        natural_key: row.get(0)?,
                        name: row.get(1)?,
                        official_url: row.get(2)?,
                        short_description: row.get(3)?,
                        categories_json: row.get(4)?,
                        target_audience_json: row.get(5)?,
                        key_features_json: row.get(6)?,
                        pricing: row.get(7)?,
                        alternatives_json: row.get(8)?,
                        pros_json: row.get(9)?,
                        cons_json: row.get(10)?,
                        web_match_percentage: row.get(11)?,
                        methodology: row.get(12)?,
                        last_processed_at: row.get(13)?,
                    })
                },
            )
            .optional()?;

        row.map(StoredRow::into_record).transpose()
    }
}

struct StoredRow {
    natural_key: String,
    name: String,
    official_url: String,
    short_description: String,
    categories_json: String,
    target_audience_json: String,
    key_features_json: String,
    pricing: String,
    alternatives_json: String,
    pros_json: String,
    cons_json: String,
    web_match_percentage: f64,
    methodology: String,
    last_processed_at: String,
}

impl StoredRow {
    fn into_record(self) -> StoreResult<PersistedRecord> {
        let alternatives: Vec<Alternative> = deserialize_json(&self.alternatives_json)?;
        Ok(PersistedRecord {
            natural_key: self.natural_key,
            report: Report {
                name: self.name,
                official_url: self.official_url,
                short_description: self.short_description,
                categories: deserialize_json(&self.categories_json)?,
                target_audience: deserialize_json(&self.target_audience_json)?,
                key_features: deserialize_json(&self.key_features_json)?,
                pricing: self.pricing,
                alternatives,
                pros: deserialize_json(&self.pros_json)?,
                cons: deserialize_json(&self.cons_json)?,
                web_match_percentage: self.web_match_percentage,
                methodology: self.methodology,
            },
            last_processed_at: timestamp_from_db(&self.last_processed_at)?,
        })
    }
}

fn serialize_json<T: Serialize>(value: &T) -> StoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn deserialize_json<T: DeserializeOwned>(raw: &str) -> StoreResult<T> {
    Ok(serde_json::from_str(raw)?)
}

fn timestamp_to_db(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp_from_db(raw: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
