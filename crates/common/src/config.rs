use std::str::FromStr;

use serde::Deserialize;

/// Default Expo-compatible push endpoint.
pub const DEFAULT_PUSH_GATEWAY_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 10)
    pub db_max_connections: u32,

    /// Push gateway endpoint that accepts a JSON array of messages
    pub push_gateway_url: String,

    /// Optional bearer token for the push gateway (enhanced push security)
    pub push_access_token: Option<String>,

    /// Per-request timeout for gateway calls in seconds (default: 30)
    pub push_request_timeout_secs: u64,

    /// When set, the API process also runs the dispatch job on this interval
    pub dispatch_interval_secs: Option<u64>,

    /// HTTP port for the trigger endpoint (default: 3000)
    pub api_port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source.
    ///
    /// Empty values count as unset, so `VAR=` falls back to the default
    /// (or disables an optional setting).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: parse_or(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            push_gateway_url: var("PUSH_GATEWAY_URL")
                .unwrap_or_else(|| DEFAULT_PUSH_GATEWAY_URL.to_string()),
            push_access_token: var("PUSH_ACCESS_TOKEN"),
            push_request_timeout_secs: parse_or(
                var("PUSH_REQUEST_TIMEOUT_SECS"),
                "PUSH_REQUEST_TIMEOUT_SECS",
                30,
            )?,
            dispatch_interval_secs: var("DISPATCH_INTERVAL_SECS")
                .map(|v| parse::<u64>(&v, "DISPATCH_INTERVAL_SECS"))
                .transpose()?
                .filter(|secs| *secs > 0),
            api_port: parse_or(var("API_PORT"), "API_PORT", 3000)?,
        })
    }
}

fn parse<T: FromStr>(value: &str, key: &str) -> anyhow::Result<T> {
    value.trim().parse().map_err(|_| {
        anyhow::anyhow!(
            "{key} must be a valid {}, got {value:?}",
            std::any::type_name::<T>()
        )
    })
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
    value.map_or(Ok(default), |v| parse(&v, key))
}
