use std::{env, net::IpAddr, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_ROOT_DOMAIN: &str = "bltnm.store";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/bltnm.db";

/// Process-wide settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub root_domain: String,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    /// `None` keeps CSRF tokens for the whole session.
    pub csrf_token_ttl: Option<Duration>,
    pub webhook_secret: Option<String>,
    /// Bearer token for the order endpoints; unset keeps them closed.
    pub admin_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let csrf_token_ttl = match optional_var("CSRF_TOKEN_TTL_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_value("CSRF_TOKEN_TTL_SECS", &raw)?)),
            None => None,
        };

        Ok(Self {
            host: parse_var("HOST", "127.0.0.1")?,
            port: parse_var("PORT", "8080")?,
            database_url: optional_var("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            root_domain: optional_var("ROOT_DOMAIN")
                .unwrap_or_else(|| DEFAULT_ROOT_DOMAIN.to_string())
                .to_ascii_lowercase(),
            rate_limit_max_requests: parse_var("RATE_LIMIT_MAX_REQUESTS", "100")?,
            rate_limit_window: Duration::from_secs(parse_var("RATE_LIMIT_WINDOW_SECS", "60")?),
            csrf_token_ttl,
            webhook_secret: optional_var("POLAR_WEBHOOK_SECRET"),
            admin_token: optional_var("ADMIN_API_TOKEN"),
        })
    }

    /// Origins allowed to make credentialed cross-origin API calls.
    pub fn first_party_origins(&self) -> Vec<String> {
        ["", "www.", "shop.", "dashboard."]
            .iter()
            .map(|sub| format!("https://{}{}", sub, self.root_domain))
            .collect()
    }
}

/// Reads a variable, treating empty values as unset.
fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = optional_var(key).unwrap_or_else(|| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
