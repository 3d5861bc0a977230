//! Environment configuration
//!
//! The broker is configured entirely through environment variables, read
//! once at startup. Durations use humantime syntax (`15m`, `30s`),
//! `REPOSITORY_URLS` is a JSON map of repository name to URL.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BrokerError, Result};

const DEFAULT_PORT: &str = "5000";
const DEFAULT_CATALOG_URL: &str = "./catalog";
const DEFAULT_CATALOG_UPDATE_INTERVAL: &str = "15m";
const DEFAULT_RELEASE_TIMEOUT: &str = "30m";

#[derive(Debug, Clone)]
pub struct Config {
    /// Basic auth credentials; auth is disabled while either is empty
    pub username: String,
    pub password: String,

    pub port: u16,
    pub catalog_url: String,
    pub catalog_update_interval: Duration,

    /// Chart repositories registered at startup, name to URL
    pub repository_urls: HashMap<String, String>,

    /// Fallback namespace when the platform context does not pin one
    pub helm_namespace: String,
    /// Fallback ingress domain for namespaces and old releases
    pub ingress_domain: String,

    /// How long a release may stay not-ready before reporting failure
    pub release_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            username: env_or_default("USERNAME", ""),
            password: env_or_default("PASSWORD", ""),
            port: parse_port(&env_or_default("PORT", DEFAULT_PORT))?,
            catalog_url: env_or_default("CATALOG_URL", DEFAULT_CATALOG_URL),
            catalog_update_interval: parse_duration(
                "CATALOG_UPDATE_INTERVAL",
                &env_or_default("CATALOG_UPDATE_INTERVAL", DEFAULT_CATALOG_UPDATE_INTERVAL),
            )?,
            repository_urls: parse_repository_urls(&env_or_default("REPOSITORY_URLS", "{}"))?,
            helm_namespace: env_or_default("HELM_NAMESPACE", ""),
            ingress_domain: env_or_default("INGRESS_DOMAIN", ""),
            release_timeout: parse_duration(
                "TIMEOUT",
                &env_or_default("TIMEOUT", DEFAULT_RELEASE_TIMEOUT),
            )?,
        })
    }

    /// Authentication is enabled only when both credentials are set
    pub fn auth_enabled(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            port: 5000,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_update_interval: Duration::from_secs(15 * 60),
            repository_urls: HashMap::new(),
            helm_namespace: String::new(),
            ingress_domain: String::new(),
            release_timeout: Duration::from_secs(30 * 60),
        }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_port(value: &str) -> Result<u16> {
    value.parse().map_err(|_| BrokerError::Config {
        name: "PORT",
        message: format!("'{}' is not a port number", value),
    })
}

fn parse_duration(name: &'static str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|err| BrokerError::Config {
        name,
        message: format!("'{}': {}", value, err),
    })
}

fn parse_repository_urls(value: &str) -> Result<HashMap<String, String>> {
    serde_json::from_str(value).map_err(|err| BrokerError::Config {
        name: "REPOSITORY_URLS",
        message: format!("expected a JSON map of name to url: {}", err),
    })
}
