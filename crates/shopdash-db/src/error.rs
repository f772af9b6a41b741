use thiserror::Error;

/// A failed round trip to the scrape database.
///
/// Callers decide whether to show an empty state or propagate.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-2xx status.
    #[error("remote query failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    /// The response body could not be decoded into the expected rows.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failure from the direct Postgres pool.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The connection could not be built from the configured settings.
    #[error("invalid connection settings: {0}")]
    InvalidConnection(String),
}
