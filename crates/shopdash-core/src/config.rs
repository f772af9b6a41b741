use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::app_config::{AppConfig, Backend, Environment};
use crate::ConfigError;

const DEFAULT_SECRETS_PATH: &str = "./secrets.yaml";
const MAX_TOP_N: i64 = 100;

/// Load application configuration from environment variables and the
/// secrets file.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a credential is missing, a value is invalid, or
/// the secrets file exists but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, plus the secrets file they point at.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a credential is missing, a value is invalid, or
/// the secrets file exists but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    let lookup = |key: &str| std::env::var(key);
    let secrets_path = PathBuf::from(
        lookup("SHOPDASH_SECRETS_PATH").unwrap_or_else(|_| DEFAULT_SECRETS_PATH.to_string()),
    );
    let secrets = read_secrets_file(&secrets_path)?;
    build_app_config(lookup, &secrets, secrets_path)
}

/// Read the YAML secrets file. A missing file yields an empty map.
fn read_secrets_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(ConfigError::Secrets {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    parse_secrets(&contents).map_err(|reason| ConfigError::Secrets {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse a flat YAML mapping of secret names to values.
///
/// Scalar values are stringified; nested values are rejected.
fn parse_secrets(contents: &str) -> Result<HashMap<String, String>, String> {
    if contents.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let raw: HashMap<String, serde_yaml::Value> =
        serde_yaml::from_str(contents).map_err(|e| e.to_string())?;

    raw.into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                _ => return Err(format!("value for {key} must be a scalar")),
            };
            Ok((key, value))
        })
        .collect()
}

/// Build application configuration using the provided env-var lookup function
/// and an already-parsed secrets map.
///
/// Credentials are taken from the environment first and fall back to the
/// secrets map. Empty strings count as absent.
fn build_app_config<F>(
    lookup: F,
    secrets: &HashMap<String, String>,
    secrets_path: PathBuf,
) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let credential = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| secrets.get(var).filter(|v| !v.trim().is_empty()).cloned())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bounded = |var: &str, default: &str, max: i64| -> Result<i64, ConfigError> {
        let value = or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if (1..=max).contains(&value) {
            Ok(value)
        } else {
            Err(invalid(var, format!("must be between 1 and {max}")))
        }
    };

    let backend = match or_default("SHOPDASH_BACKEND", "supabase").as_str() {
        "supabase" => Backend::Supabase {
            url: credential("SUPABASE_URL")?,
            api_key: credential("SUPABASE_API_KEY")?,
        },
        "postgres" => Backend::Postgres {
            database_url: credential("DATABASE_URL")?,
        },
        other => {
            return Err(invalid(
                "SHOPDASH_BACKEND",
                format!("unknown backend '{other}' (expected supabase or postgres)"),
            ))
        }
    };

    let env = parse_environment(&or_default("SHOPDASH_ENV", "development"));

    let bind_addr = or_default("SHOPDASH_BIND_ADDR", "0.0.0.0:8501")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("SHOPDASH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("SHOPDASH_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("SHOPDASH_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("SHOPDASH_USER_AGENT", "shopdash/0.1 (scrape-analytics)");
    let top_n = parse_bounded("SHOPDASH_TOP_N", "10", MAX_TOP_N)?;
    let default_range_days = parse_bounded("SHOPDASH_DEFAULT_RANGE_DAYS", "30", 3650)?;

    let db_max_connections = parse_u32("SHOPDASH_DB_MAX_CONNECTIONS", "5")?;
    let db_acquire_timeout_secs = parse_u64("SHOPDASH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        env,
        backend,
        bind_addr,
        log_level,
        secrets_path,
        request_timeout_secs,
        user_agent,
        top_n,
        default_range_days,
        db_max_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
