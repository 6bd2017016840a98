//! Usage statistics store.
//!
//! Append-only event log plus daily rollups by provider and by
//! (provider, model), backed by SQLite. Rollups are updated
//! read-increment-write inside the same transaction as the event insert,
//! never by rescanning the log; full-table scans are reserved for the
//! summary queries.

use chrono::{Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use switchyard_core::{ModelUsage, ProviderUsage, UsageEvent, UsageSummary};

use crate::config::StatisticsConfig;
use crate::error::StoreError;

/// Timestamp format stored in the events table (UTC, lexicographically
/// ordered, matching SQLite's CURRENT_TIMESTAMP).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format used as the rollup key.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed store of usage events and daily rollups.
///
/// All access is serialized through one connection mutex; queries therefore
/// always observe a consistent snapshot, never a half-applied upsert.
pub struct StatisticsStore {
    conn: Mutex<Connection>,
    enabled: bool,
}

impl StatisticsStore {
    /// Opens (or creates) the statistics database and applies the schema
    /// idempotently.
    ///
    /// When statistics are disabled, an in-memory database backs the store
    /// so queries still answer with empty aggregates.
    pub fn open(config: &StatisticsConfig) -> Result<Self, StoreError> {
        if !config.enabled {
            debug!("Statistics disabled, using in-memory store");
            let store = Self::open_in_memory()?;
            return Ok(Self {
                enabled: false,
                ..store
            });
        }

        if let Some(parent) = config.database_file.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.database_file)?;
        Self::init_schema(&conn)?;
        info!(path = %config.database_file.display(), "Opened statistics store");

        Ok(Self {
            conn: Mutex::new(conn),
            enabled: true,
        })
    }

    /// Opens an in-memory store. Used for tests and the disabled path.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            enabled: true,
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS usage_events (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 provider TEXT NOT NULL,
                 model_id TEXT NOT NULL,
                 timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                 request_tokens INTEGER,
                 response_tokens INTEGER,
                 total_tokens INTEGER,
                 response_time_ms INTEGER,
                 success BOOLEAN NOT NULL DEFAULT TRUE,
                 error_message TEXT
             );

             CREATE TABLE IF NOT EXISTS provider_rollups (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 provider TEXT NOT NULL,
                 date DATE NOT NULL,
                 total_requests INTEGER NOT NULL DEFAULT 0,
                 successful_requests INTEGER NOT NULL DEFAULT 0,
                 failed_requests INTEGER NOT NULL DEFAULT 0,
                 total_tokens INTEGER NOT NULL DEFAULT 0,
                 avg_response_time_ms REAL NOT NULL DEFAULT 0,
                 UNIQUE(provider, date)
             );

             CREATE TABLE IF NOT EXISTS model_rollups (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 provider TEXT NOT NULL,
                 model_id TEXT NOT NULL,
                 date DATE NOT NULL,
                 usage_count INTEGER NOT NULL DEFAULT 0,
                 total_tokens INTEGER NOT NULL DEFAULT 0,
                 avg_response_time_ms REAL NOT NULL DEFAULT 0,
                 UNIQUE(provider, model_id, date)
             );

             CREATE INDEX IF NOT EXISTS idx_usage_events_timestamp ON usage_events(timestamp);
             CREATE INDEX IF NOT EXISTS idx_usage_events_provider ON usage_events(provider);
             CREATE INDEX IF NOT EXISTS idx_usage_events_model ON usage_events(model_id);
             CREATE INDEX IF NOT EXISTS idx_provider_rollups_date ON provider_rollups(date);
             CREATE INDEX IF NOT EXISTS idx_model_rollups_date ON model_rollups(date);",
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means a panic mid-query elsewhere; the
        // connection itself is still usable.
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Appends a usage event and updates both rollup tables in one
    /// transaction.
    pub fn record(&self, event: &UsageEvent) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }

        let now = Utc::now();
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let date = now.format(DATE_FORMAT).to_string();
        let total_tokens = event.total_tokens();

        let mut conn = self.lock_conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO usage_events
                 (provider, model_id, timestamp, request_tokens, response_tokens,
                  total_tokens, response_time_ms, success, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.provider.as_str(),
                event.model_id,
                timestamp,
                event.request_tokens,
                event.response_tokens,
                total_tokens,
                event.response_time_ms,
                event.success,
                event.error_message,
            ],
        )?;

        Self::upsert_provider_rollup(
            &tx,
            event.provider.as_str(),
            &date,
            i64::from(total_tokens.unwrap_or(0)),
            event.response_time_ms,
            event.success,
        )?;
        Self::upsert_model_rollup(
            &tx,
            event.provider.as_str(),
            &event.model_id,
            &date,
            i64::from(total_tokens.unwrap_or(0)),
            event.response_time_ms,
        )?;

        tx.commit()?;
        Ok(())
    }

    fn upsert_provider_rollup(
        tx: &Transaction<'_>,
        provider: &str,
        date: &str,
        tokens: i64,
        response_time_ms: Option<u64>,
        success: bool,
    ) -> Result<(), StoreError> {
        let existing = tx
            .query_row(
                "SELECT total_requests, successful_requests, failed_requests,
                        total_tokens, avg_response_time_ms
                 FROM provider_rollups WHERE provider = ?1 AND date = ?2",
                params![provider, date],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, f64>(4)?,
                    ))
                },
            )
            .optional()?;

        match existing {
            Some((requests, successes, failures, total, avg)) => {
                let new_requests = requests + 1;
                let new_avg = match response_time_ms {
                    Some(sample) => {
                        (avg * requests as f64 + sample as f64) / new_requests as f64
                    }
                    None => avg,
                };
                tx.execute(
                    "UPDATE provider_rollups
                     SET total_requests = ?1, successful_requests = ?2,
                         failed_requests = ?3, total_tokens = ?4,
                         avg_response_time_ms = ?5
                     WHERE provider = ?6 AND date = ?7",
                    params![
                        new_requests,
                        successes + i64::from(success),
                        failures + i64::from(!success),
                        total + tokens,
                        new_avg,
                        provider,
                        date,
                    ],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO provider_rollups
                         (provider, date, total_requests, successful_requests,
                          failed_requests, total_tokens, avg_response_time_ms)
                     VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6)",
                    params![
                        provider,
                        date,
                        i64::from(success),
                        i64::from(!success),
                        tokens,
                        response_time_ms.unwrap_or(0) as f64,
                    ],
                )?;
            }
        }
        Ok(())
    }

    fn upsert_model_rollup(
        tx: &Transaction<'_>,
        provider: &str,
        model_id: &str,
        date: &str,
        tokens: i64,
        response_time_ms: Option<u64>,
    ) -> Result<(), StoreError> {
        let existing = tx
            .query_row(
                "SELECT usage_count, total_tokens, avg_response_time_ms
                 FROM model_rollups
                 WHERE provider = ?1 AND model_id = ?2 AND date = ?3",
                params![provider, model_id, date],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                    ))
                },
            )
            .optional()?;

        match existing {
            Some((count, total, avg)) => {
                let new_count = count + 1;
                let new_avg = match response_time_ms {
                    Some(sample) => (avg * count as f64 + sample as f64) / new_count as f64,
                    None => avg,
                };
                tx.execute(
                    "UPDATE model_rollups
                     SET usage_count = ?1, total_tokens = ?2, avg_response_time_ms = ?3
                     WHERE provider = ?4 AND model_id = ?5 AND date = ?6",
                    params![new_count, total + tokens, new_avg, provider, model_id, date],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO model_rollups
                         (provider, model_id, date, usage_count, total_tokens,
                          avg_response_time_ms)
                     VALUES (?1, ?2, ?3, 1, ?4, ?5)",
                    params![
                        provider,
                        model_id,
                        date,
                        tokens,
                        response_time_ms.unwrap_or(0) as f64,
                    ],
                )?;
            }
        }
        Ok(())
    }

    /// Aggregates provider rollups over the trailing window, most-used
    /// first; ties break by provider name.
    pub fn popular_providers(&self, window_days: u32) -> Result<Vec<ProviderUsage>, StoreError> {
        let start_date = (Utc::now() - Duration::days(i64::from(window_days)))
            .format(DATE_FORMAT)
            .to_string();

        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT provider,
                    SUM(total_requests), SUM(successful_requests),
                    SUM(failed_requests), SUM(total_tokens),
                    AVG(avg_response_time_ms)
             FROM provider_rollups
             WHERE date >= ?1
             GROUP BY provider
             ORDER BY SUM(total_requests) DESC, provider ASC",
        )?;

        let rows = stmt.query_map(params![start_date], |row| {
            let total: i64 = row.get(1)?;
            let successes: i64 = row.get(2)?;
            Ok(ProviderUsage {
                provider: row.get(0)?,
                total_requests: total as u64,
                successful_requests: successes as u64,
                failed_requests: row.get::<_, i64>(3)? as u64,
                success_rate: if total > 0 {
                    successes as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
                total_tokens: row.get::<_, i64>(4)? as u64,
                avg_response_time_ms: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Aggregates model rollups over the trailing window, most-used first;
    /// ties break by model id.
    pub fn popular_models(
        &self,
        window_days: u32,
        limit: u32,
    ) -> Result<Vec<ModelUsage>, StoreError> {
        let start_date = (Utc::now() - Duration::days(i64::from(window_days)))
            .format(DATE_FORMAT)
            .to_string();

        let conn = self.lock_conn();
        let mut stmt = conn.prepare(
            "SELECT provider, model_id,
                    SUM(usage_count), SUM(total_tokens), AVG(avg_response_time_ms)
             FROM model_rollups
             WHERE date >= ?1
             GROUP BY provider, model_id
             ORDER BY SUM(usage_count) DESC, model_id ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![start_date, limit], |row| {
            Ok(ModelUsage {
                provider: row.get(0)?,
                model_id: row.get(1)?,
                usage_count: row.get::<_, i64>(2)? as u64,
                total_tokens: row.get::<_, i64>(3)? as u64,
                avg_response_time_ms: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Computes the all-time summary by full-table aggregation.
    ///
    /// Acceptable at gateway request volumes; this is not telemetry-scale
    /// storage.
    pub fn summary(&self) -> Result<UsageSummary, StoreError> {
        let conn = self.lock_conn();

        let (total, successes, tokens, avg_rt) = conn.query_row(
            "SELECT COUNT(*),
                    SUM(CASE WHEN success THEN 1 ELSE 0 END),
                    SUM(total_tokens),
                    AVG(response_time_ms)
             FROM usage_events",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                ))
            },
        )?;

        let since = (Utc::now() - Duration::hours(24))
            .format(TIMESTAMP_FORMAT)
            .to_string();
        let (requests_24h, tokens_24h) = conn.query_row(
            "SELECT COUNT(*), SUM(total_tokens) FROM usage_events WHERE timestamp >= ?1",
            params![since],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                ))
            },
        )?;

        let (unique_providers, unique_models) = conn.query_row(
            "SELECT COUNT(DISTINCT provider), COUNT(DISTINCT model_id) FROM usage_events",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;

        Ok(UsageSummary {
            total_requests: total as u64,
            successful_requests: successes as u64,
            success_rate: if total > 0 {
                successes as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            total_tokens: tokens as u64,
            avg_response_time_ms: avg_rt,
            requests_24h: requests_24h as u64,
            tokens_24h: tokens_24h as u64,
            unique_providers: unique_providers as u64,
            unique_models: unique_models as u64,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{ProviderId, TokenUsage};

    fn usage(prompt: u32, completion: u32) -> Option<TokenUsage> {
        Some(TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        })
    }

    #[test]
    fn test_summary_success_rate_is_exact() {
        let store = StatisticsStore::open_in_memory().unwrap();

        for i in 0..4 {
            let event = if i < 3 {
                UsageEvent::success(ProviderId::OpenAi, "gpt-4", usage(10, 20), 100)
            } else {
                UsageEvent::failure(ProviderId::OpenAi, "gpt-4", "timeout", 50)
            };
            store.record(&event).unwrap();
        }

        let summary = store.summary().unwrap();
        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.successful_requests, 3);
        assert_eq!(summary.success_rate, 75.0);
        assert_eq!(summary.total_tokens, 90);
        assert_eq!(summary.requests_24h, 4);
        assert_eq!(summary.tokens_24h, 90);
        assert_eq!(summary.unique_providers, 1);
        assert_eq!(summary.unique_models, 1);
    }

    #[test]
    fn test_empty_store_summary_is_zeroed() {
        let store = StatisticsStore::open_in_memory().unwrap();
        let summary = store.summary().unwrap();
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_popular_models_orders_and_breaks_ties() {
        let store = StatisticsStore::open_in_memory().unwrap();

        for _ in 0..3 {
            store
                .record(&UsageEvent::success(ProviderId::OpenAi, "gpt-4", None, 10))
                .unwrap();
        }
        // Two models tied at one use each; the tie breaks by model id.
        store
            .record(&UsageEvent::success(ProviderId::Gemini, "gemini-pro", None, 10))
            .unwrap();
        store
            .record(&UsageEvent::success(ProviderId::Cody, "claude-3", None, 10))
            .unwrap();

        let models = store.popular_models(7, 10).unwrap();
        assert_eq!(models.len(), 3);
        assert_eq!(models[0].model_id, "gpt-4");
        assert_eq!(models[0].usage_count, 3);
        assert_eq!(models[1].model_id, "claude-3");
        assert_eq!(models[2].model_id, "gemini-pro");

        let capped = store.popular_models(7, 2).unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_popular_providers_aggregates_rollups() {
        let store = StatisticsStore::open_in_memory().unwrap();

        store
            .record(&UsageEvent::success(ProviderId::OpenAi, "gpt-4", usage(5, 5), 100))
            .unwrap();
        store
            .record(&UsageEvent::success(ProviderId::OpenAi, "gpt-4", usage(5, 5), 200))
            .unwrap();
        store
            .record(&UsageEvent::failure(ProviderId::OpenAi, "gpt-4", "err", 300))
            .unwrap();
        store
            .record(&UsageEvent::success(ProviderId::Gemini, "gemini-pro", None, 50))
            .unwrap();

        let providers = store.popular_providers(7).unwrap();
        assert_eq!(providers.len(), 2);

        let openai = &providers[0];
        assert_eq!(openai.provider, "openai");
        assert_eq!(openai.total_requests, 3);
        assert_eq!(openai.successful_requests, 2);
        assert_eq!(openai.failed_requests, 1);
        assert_eq!(openai.total_tokens, 20);
        // Incremental average: ((100 + 200) / 2 * 2 + 300) / 3 = 200.
        assert!((openai.avg_response_time_ms - 200.0).abs() < 1e-9);

        assert_eq!(providers[1].provider, "gemini");
    }

    #[test]
    fn test_window_excludes_old_rollups() {
        let store = StatisticsStore::open_in_memory().unwrap();
        store
            .record(&UsageEvent::success(ProviderId::OpenAi, "gpt-4", None, 10))
            .unwrap();

        // Age the rollup rows out of the window.
        {
            let conn = store.lock_conn();
            conn.execute("UPDATE provider_rollups SET date = '2000-01-01'", [])
                .unwrap();
            conn.execute("UPDATE model_rollups SET date = '2000-01-01'", [])
                .unwrap();
        }

        assert!(store.popular_providers(7).unwrap().is_empty());
        assert!(store.popular_models(7, 10).unwrap().is_empty());
        // The raw event log still feeds the all-time summary.
        assert_eq!(store.summary().unwrap().total_requests, 1);
    }

    #[test]
    fn test_disabled_store_records_nothing() {
        let config = StatisticsConfig {
            enabled: false,
            ..StatisticsConfig::default()
        };
        let store = StatisticsStore::open(&config).unwrap();
        store
            .record(&UsageEvent::success(ProviderId::OpenAi, "gpt-4", None, 10))
            .unwrap();
        assert_eq!(store.summary().unwrap().total_requests, 0);
    }

    #[test]
    fn test_failure_keeps_error_message_in_event_log() {
        let store = StatisticsStore::open_in_memory().unwrap();
        store
            .record(&UsageEvent::failure(ProviderId::Cody, "m", "rate limited", 42))
            .unwrap();

        let conn = store.lock_conn();
        let (success, message): (bool, String) = conn
            .query_row(
                "SELECT success, error_message FROM usage_events",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(!success);
        assert_eq!(message, "rate limited");
    }
}
