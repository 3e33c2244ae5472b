//! Controller configuration, read once from the environment

use anyhow::{Context, Result};
use gerrit_router_core::BackendKind;
use std::net::SocketAddr;
use std::time::Duration;

pub const INGRESS_TYPE_VAR: &str = "GERRIT_ROUTER_INGRESS_TYPE";
pub const WATCH_NAMESPACE_VAR: &str = "GERRIT_ROUTER_WATCH_NAMESPACE";
pub const METRICS_ADDR_VAR: &str = "GERRIT_ROUTER_METRICS_ADDR";
pub const REQUEUE_SECONDS_VAR: &str = "GERRIT_ROUTER_REQUEUE_SECONDS";
pub const ERROR_REQUEUE_SECONDS_VAR: &str = "GERRIT_ROUTER_ERROR_REQUEUE_SECONDS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Gateway technology routes are compiled for
    pub backend_kind: BackendKind,
    /// Only watch this namespace; all namespaces if unset
    pub watch_namespace: Option<String>,
    /// Listener for `/metrics` and `/healthz`
    pub metrics_addr: SocketAddr,
    /// Periodic resync interval
    pub requeue: Duration,
    /// Retry delay after a transient failure
    pub error_requeue: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            backend_kind: BackendKind::None,
            watch_namespace: None,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            requeue: Duration::from_secs(300),
            error_requeue: Duration::from_secs(60),
        }
    }
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a variable lookup; unset or empty
    /// variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(kind) = get(INGRESS_TYPE_VAR) {
            config.backend_kind = kind
                .parse()
                .with_context(|| format!("Invalid {}", INGRESS_TYPE_VAR))?;
        }
        config.watch_namespace = get(WATCH_NAMESPACE_VAR);
        if let Some(addr) = get(METRICS_ADDR_VAR) {
            config.metrics_addr = addr
                .parse()
                .with_context(|| format!("Invalid {}: {}", METRICS_ADDR_VAR, addr))?;
        }
        if let Some(secs) = get(REQUEUE_SECONDS_VAR) {
            config.requeue = parse_seconds(REQUEUE_SECONDS_VAR, &secs)?;
        }
        if let Some(secs) = get(ERROR_REQUEUE_SECONDS_VAR) {
            config.error_requeue = parse_seconds(ERROR_REQUEUE_SECONDS_VAR, &secs)?;
        }

        Ok(config)
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {}: {}", key, value))?;
    Ok(Duration::from_secs(secs))
}
