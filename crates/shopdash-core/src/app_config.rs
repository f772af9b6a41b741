use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which transport the dashboard uses to reach the scrape database, with
/// the credentials that transport needs.
#[derive(Clone, PartialEq, Eq)]
pub enum Backend {
    /// Supabase REST (`PostgREST`) endpoints plus the `run_query` procedure.
    Supabase { url: String, api_key: String },
    /// Direct Postgres connection.
    Postgres { database_url: String },
}

impl Backend {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Supabase { .. } => "supabase",
            Backend::Postgres { .. } => "postgres",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("api_key", &"[redacted]")
                .finish(),
            Backend::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[redacted]")
                .finish(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub backend: Backend,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub secrets_path: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Rows per ranked chart (top products, filters, merchants).
    pub top_n: i64,
    /// Width of the default date range ending today.
    pub default_range_days: i64,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("backend", &self.backend)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("secrets_path", &self.secrets_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("top_n", &self.top_n)
            .field("default_range_days", &self.default_range_days)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
