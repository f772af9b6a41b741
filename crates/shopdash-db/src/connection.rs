use serde::de::DeserializeOwned;
use serde_json::Value;
use shopdash_core::{AppConfig, Backend};

use crate::error::QueryError;
use crate::postgres::{PoolConfig, PostgresBackend};
use crate::statements::TableSelect;
use crate::supabase::SupabaseClient;

/// One result row as returned by the remote engine.
pub type Row = serde_json::Map<String, Value>;

/// Handle to the scrape database.
///
/// Created once at process start and shared by every request; both variants
/// are cheap to clone and safe to use concurrently.
#[derive(Debug, Clone)]
pub enum Connection {
    Supabase(SupabaseClient),
    Postgres(PostgresBackend),
}

impl Connection {
    /// Builds the backend named by `config.backend`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the URL or credentials cannot be used to
    /// construct a client. No network traffic happens here.
    pub fn connect(config: &AppConfig) -> Result<Self, QueryError> {
        match &config.backend {
            Backend::Supabase { url, api_key } => Ok(Self::Supabase(SupabaseClient::new(
                url,
                api_key,
                config.request_timeout_secs,
                &config.user_agent,
            )?)),
            Backend::Postgres { database_url } => Ok(Self::Postgres(
                PostgresBackend::connect_lazy(database_url, PoolConfig::from_app_config(config))?,
            )),
        }
    }

    /// Reads rows from one table.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`QueryError`].
    pub async fn select(&self, select: &TableSelect) -> Result<Vec<Row>, QueryError> {
        match self {
            Self::Supabase(client) => client.select(select).await,
            Self::Postgres(backend) => backend.select(select).await,
        }
    }

    /// Executes an aggregate statement remotely and returns its rows.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`QueryError`].
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        match self {
            Self::Supabase(client) => client.run_query(sql).await,
            Self::Postgres(backend) => backend.run_query(sql).await,
        }
    }

    /// Cheap liveness check.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`QueryError`].
    pub async fn ping(&self) -> Result<(), QueryError> {
        match self {
            Self::Supabase(client) => client
                .select(&TableSelect::new("clients", &["id"]).limit(1))
                .await
                .map(|_| ()),
            Self::Postgres(backend) => backend.ping().await,
        }
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Supabase(_) => "supabase",
            Self::Postgres(_) => "postgres",
        }
    }
}

/// Turns a response payload into rows. `null` counts as no rows.
pub(crate) fn rows_from_value(value: Value, context: &str) -> Result<Vec<Row>, QueryError> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other).map_err(|e| QueryError::Deserialize {
            context: context.to_string(),
            source: e,
        }),
    }
}

/// Decodes rows into typed records.
pub(crate) fn decode_rows<T: DeserializeOwned>(
    rows: Vec<Row>,
    context: &str,
) -> Result<Vec<T>, QueryError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| QueryError::Deserialize {
                context: context.to_string(),
                source: e,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_payload_is_empty() {
        let rows = rows_from_value(Value::Null, "test").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn array_of_objects_becomes_rows() {
        let rows = rows_from_value(json!([{"id": 1}, {"id": 2}]), "test").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], json!(2));
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let err = rows_from_value(json!({"id": 1}), "test").unwrap_err();
        assert!(matches!(err, QueryError::Deserialize { .. }));
    }

    #[test]
    fn decode_rows_reports_context() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct IdOnly {
            id: i64,
        }
        let rows = rows_from_value(json!([{"id": "x"}]), "ids").unwrap();
        let err = decode_rows::<IdOnly>(rows, "ids").unwrap_err();
        match err {
            QueryError::Deserialize { context, .. } => assert_eq!(context, "ids"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
