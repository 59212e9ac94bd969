//! Client configuration.

use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
/// sFlow-RT's default REST port.
pub const DEFAULT_PORT: u16 = 8008;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_HOST: &str = "SFLOW_RT_HOST";
pub const ENV_PORT: &str = "SFLOW_RT_PORT";
pub const ENV_TIMEOUT_SECS: &str = "SFLOW_RT_TIMEOUT_SECS";

/// Where the sFlow-RT server lives and how long a request may take.
///
/// The timeout bounds each whole request (connect, send, receive) and is
/// fixed for the lifetime of the client built from this config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from `SFLOW_RT_HOST`, `SFLOW_RT_PORT` and
    /// `SFLOW_RT_TIMEOUT_SECS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(host) = lookup(ENV_HOST).filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_PORT} must be a port number, got {port:?}")))?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got {secs:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
