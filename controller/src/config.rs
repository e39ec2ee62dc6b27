//! Search client configuration.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};


pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9200";
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Sent as the `x-access-key` header when set.
    pub access_key: Option<String>,
    /// Log full request bodies at `info` instead of `debug`.
    pub debug: bool,
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_key: None,
            debug: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Reads `ELASTIC_ENDPOINT`, `ELASTIC_ACCESS_KEY`, `ELASTIC_DEBUG` and
    /// `ELASTIC_TIMEOUT_MS`; unset variables keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(endpoint) = lookup("ELASTIC_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(access_key) = lookup("ELASTIC_ACCESS_KEY").filter(|k| !k.is_empty()) {
            config.access_key = Some(access_key);
        }
        if let Some(debug) = lookup("ELASTIC_DEBUG") {
            config.debug = match debug.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "" | "0" | "false" | "no" | "off" => false,
                other => anyhow::bail!("Invalid ELASTIC_DEBUG value: {}", other),
            };
        }
        if let Some(timeout) = lookup("ELASTIC_TIMEOUT_MS") {
            config.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid ELASTIC_TIMEOUT_MS value: {timeout}"))?;
        }
        Ok(config)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("Invalid client configuration")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
