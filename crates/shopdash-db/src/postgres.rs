//! Direct Postgres backend.
//!
//! Runs the same statements the Supabase `run_query` procedure would, wrapping
//! each in `json_agg` so both backends hand back identical JSON rows.

use std::time::Duration;

use shopdash_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::connection::{rows_from_value, Row};
use crate::error::QueryError;
use crate::statements::TableSelect;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

/// Pool-backed executor. Connections are opened on first use.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Builds a lazy pool; no connection is attempted until the first query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Database`] if `database_url` cannot be parsed.
    pub fn connect_lazy(database_url: &str, config: PoolConfig) -> Result<Self, QueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool (used by `#[sqlx::test]`).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Executes `sql` and returns its rows as JSON objects.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Database`] if the statement fails.
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        let wrapped = format!("SELECT COALESCE(json_agg(t), '[]'::json) FROM ({sql}) t");
        tracing::trace!(sql, "postgres run_query");
        let value = sqlx::query_scalar::<_, serde_json::Value>(&wrapped)
            .fetch_one(&self.pool)
            .await?;
        rows_from_value(value, "postgres query")
    }

    /// Reads rows from one table.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Database`] if the statement fails.
    pub async fn select(&self, select: &TableSelect) -> Result<Vec<Row>, QueryError> {
        self.run_query(&select.to_sql()).await
    }

    /// Sends `SELECT 1` to verify the pool has a live connection.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Database`] if the query fails.
    pub async fn ping(&self) -> Result<(), QueryError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
