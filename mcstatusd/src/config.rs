use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub dns: DnsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Browsers probe /favicon.ico constantly; keep those out of the access log
    #[serde(default)]
    pub log_favicon_requests: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_bedrock_tries")]
    pub bedrock_tries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DnsConfig {
    #[serde(default = "default_use_system_conf")]
    pub use_system_conf: bool,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_bedrock_tries() -> u32 {
    3
}

fn default_use_system_conf() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_favicon_requests: false,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            bedrock_tries: default_bedrock_tries(),
        }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            use_system_conf: default_use_system_conf(),
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}
