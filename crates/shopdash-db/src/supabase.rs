//! HTTP client for Supabase's REST layer (`PostgREST`).
//!
//! Table reads go to `GET /rest/v1/{table}`; aggregate statements go to the
//! `run_query` remote procedure at `POST /rest/v1/rpc/run_query`, which
//! executes the SQL and returns its rows as a JSON array.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, Url};

use crate::connection::{rows_from_value, Row};
use crate::error::QueryError;
use crate::statements::TableSelect;

const RUN_QUERY_PROCEDURE: &str = "rpc/run_query";

/// Client for one Supabase project.
///
/// Both the `apikey` and `Authorization: Bearer` headers carry the project
/// key on every request.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    rest_url: Url,
}

impl SupabaseClient {
    /// Creates a client for the project at `project_url`.
    ///
    /// `project_url` may point at a mock server in tests.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidConnection`] if the URL or API key cannot
    /// be used, or [`QueryError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        project_url: &str,
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, QueryError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| QueryError::InvalidConnection("API key is not a valid header value".into()))?;
        key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| QueryError::InvalidConnection("API key is not a valid header value".into()))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/rest/v1/", project_url.trim_end_matches('/'));
        let rest_url = Url::parse(&normalised).map_err(|e| {
            QueryError::InvalidConnection(format!("invalid Supabase URL '{project_url}': {e}"))
        })?;

        Ok(Self { client, rest_url })
    }

    /// Reads rows from one table.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Http`] on network failure.
    /// - [`QueryError::Remote`] on a non-2xx status.
    /// - [`QueryError::Deserialize`] if the body is not a JSON array of objects.
    pub async fn select(&self, select: &TableSelect) -> Result<Vec<Row>, QueryError> {
        let url = self.table_url(select)?;
        tracing::debug!(table = select.table, "supabase table select");
        let response = self.client.get(url).send().await?;
        let body = Self::read_json(response, select.table).await?;
        rows_from_value(body, select.table)
    }

    /// Executes `sql` through the `run_query` procedure.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Http`] on network failure.
    /// - [`QueryError::Remote`] on a non-2xx status (SQL errors surface here).
    /// - [`QueryError::Deserialize`] if the body is not a JSON array of objects.
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        let url = self.endpoint(RUN_QUERY_PROCEDURE)?;
        tracing::trace!(sql, "supabase run_query");
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "query_text": sql }))
            .send()
            .await?;
        let body = Self::read_json(response, RUN_QUERY_PROCEDURE).await?;
        rows_from_value(body, RUN_QUERY_PROCEDURE)
    }

    fn endpoint(&self, path: &str) -> Result<Url, QueryError> {
        self.rest_url
            .join(path)
            .map_err(|e| QueryError::InvalidConnection(format!("invalid endpoint '{path}': {e}")))
    }

    /// Builds `/rest/v1/{table}?select=...` with percent-encoded filters.
    fn table_url(&self, select: &TableSelect) -> Result<Url, QueryError> {
        let mut url = self.endpoint(select.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in select.postgrest_params() {
                pairs.append_pair(&k, &v);
            }
        }
        Ok(url)
    }

    /// Asserts a 2xx status and parses the body as JSON.
    ///
    /// `PostgREST` error bodies look like `{"code", "message", "details",
    /// "hint"}`; the `message` field becomes the error text when present.
    async fn read_json(response: Response, context: &str) -> Result<serde_json::Value, QueryError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .and_then(serde_json::Value::as_str)
                        .map(ToOwned::to_owned)
                })
                .unwrap_or_else(|| body.trim().to_string());
            return Err(QueryError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| QueryError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}
