pub mod app_config;
pub mod config;
pub mod model;
pub mod selection;

pub use app_config::{AppConfig, Backend, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use model::{Client, Keyword, Product, ProductScrape, ScrapeDate};
pub use selection::{parse_day, DateRange, FilterMode, Metric, ALL_KEYWORDS};

use std::path::PathBuf;

use thiserror::Error;

/// Configuration failures. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value {0} (set it in the environment or the secrets file)")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read secrets file {}: {reason}", path.display())]
    Secrets { path: PathBuf, reason: String },
}
