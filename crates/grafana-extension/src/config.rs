use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub grafana: GrafanaConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GrafanaConfig {
    pub api_base_url: String,
    #[serde(skip_serializing)]
    pub service_token: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for GrafanaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.service_token.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("GrafanaConfig")
            .field("api_base_url", &self.api_base_url)
            .field("service_token", &token)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub interval: Duration,
    /// Host prefix used in target ids. `None` means the ids carry no host.
    pub host: Option<String>,
    pub attribute_excludes: Vec<String>,
    pub health_check: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            host: None,
            attribute_excludes: Vec::new(),
            health_check: false,
        }
    }
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let api_base_url = std::env::var("GRAFANA_API_BASE_URL").map_err(|_| {
            crate::Error::Config("GRAFANA_API_BASE_URL must be set".to_string())
        })?;

        let config = Config {
            server: ServerConfig {
                addr: std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8083".to_string()),
            },
            grafana: GrafanaConfig {
                api_base_url: api_base_url.trim_end_matches('/').to_string(),
                service_token: std::env::var("GRAFANA_SERVICE_TOKEN").unwrap_or_default(),
                request_timeout: Duration::from_secs(parse_env("GRAFANA_REQUEST_TIMEOUT_SECS", 30)),
            },
            discovery: DiscoveryConfig {
                interval: Duration::from_secs(parse_env("DISCOVERY_INTERVAL_SECS", 60)),
                host: std::env::var("DISCOVERY_HOST").ok().filter(|h| !h.is_empty()),
                attribute_excludes: std::env::var("DISCOVERY_ATTRIBUTES_EXCLUDES_ALERT")
                    .map(|v| split_list(&v))
                    .unwrap_or_default(),
                health_check: std::env::var("DISCOVERY_HEALTH_CHECK")
                    .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
                    .unwrap_or(false),
            },
        };

        config.validate()
    }

    /// Checks the base URL and fills in the discovery host from it when unset.
    pub fn validate(mut self) -> crate::Result<Self> {
        let url = Url::parse(&self.grafana.api_base_url).map_err(|e| {
            crate::Error::Config(format!(
                "GRAFANA_API_BASE_URL '{}' is not a valid URL: {}",
                self.grafana.api_base_url, e
            ))
        })?;

        if self.grafana.service_token.is_empty() {
            tracing::warn!("GRAFANA_SERVICE_TOKEN is not set. Requests to Grafana will be unauthenticated.");
        }

        if self.discovery.interval.is_zero() {
            return Err(crate::Error::Config(
                "DISCOVERY_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        if self.discovery.host.is_none() {
            self.discovery.host = url.host_str().map(str::to_string);
        }

        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8083".to_string(),
            },
            grafana: GrafanaConfig {
                api_base_url: "http://localhost:3000".to_string(),
                service_token: "".to_string(),
                request_timeout: Duration::from_secs(30),
            },
            discovery: DiscoveryConfig::default(),
        }
    }
}

fn parse_env(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
