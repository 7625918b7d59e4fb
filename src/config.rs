//! Runtime settings from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use crate::protocol::DEFAULT_NAMESPACE;
use crate::receiver::{ReceiverOptions, DEFAULT_GREETING};

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub namespace: String,
    pub greeting: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Reads `RECEIVER_*` variables; call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let addr = get("RECEIVER_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".into())
            .parse::<SocketAddr>()
            .context("RECEIVER_ADDR is not a socket address")?;
        let timeout_secs: u64 = get("REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            addr,
            namespace: get("RECEIVER_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            greeting: get("RECEIVER_GREETING").unwrap_or_else(|| DEFAULT_GREETING.into()),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn receiver_options(&self) -> ReceiverOptions {
        ReceiverOptions {
            namespace: self.namespace.clone(),
            greeting: self.greeting.clone(),
        }
    }
}
