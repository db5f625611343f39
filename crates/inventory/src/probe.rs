//! Best-effort host probes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::future::Cache;
use provisioner_core::{HostRecord, Result};
use telemetry::metrics;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::InventoryConfig;
use crate::remote::{AgentQuery, RemoteQuery};

/// True if any of `ports` accepts a TCP connection within `budget`.
pub async fn tcp_reachable(host: &str, ports: &[u16], budget: Duration) -> bool {
    let mut attempts = JoinSet::new();
    for &port in ports {
        let addr = format!("{host}:{port}");
        attempts.spawn(async move { TcpStream::connect(addr).await.is_ok() });
    }

    let first_success = async {
        while let Some(attempt) = attempts.join_next().await {
            if matches!(attempt, Ok(true)) {
                return true;
            }
        }
        false
    };

    timeout(budget, first_success).await.unwrap_or(false)
}

/// Host metadata lookups that never fail the caller.
///
/// Each query runs under its own timeout and degrades to an unknown value
/// (`false` / `None`) on any error. Full records are cached per host.
#[derive(Clone)]
pub struct HostInventoryProbe {
    config: InventoryConfig,
    remote: Arc<dyn RemoteQuery>,
    cache: Cache<String, HostRecord>,
}

impl HostInventoryProbe {
    pub fn new(config: InventoryConfig, remote: Arc<dyn RemoteQuery>) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl())
            .build();

        Self {
            config,
            remote,
            cache,
        }
    }

    /// Probe backed by the HTTP inventory agent described in `config`.
    pub fn from_config(config: InventoryConfig) -> Result<Self> {
        let remote = AgentQuery::from_config(&config)?;
        Ok(Self::new(config, Arc::new(remote)))
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Whether remote metadata queries are live.
    pub fn remote_enabled(&self) -> bool {
        self.remote.is_enabled()
    }

    pub async fn is_reachable(&self, host: &str) -> bool {
        metrics().host_probes.inc();
        let reachable =
            tcp_reachable(host, &self.config.ports, self.config.reachability_timeout()).await;
        debug!(host, reachable, "Reachability probe");
        reachable
    }

    pub async fn last_reboot(&self, host: &str) -> Option<DateTime<Utc>> {
        self.bounded(host, "last reboot", self.remote.last_boot_time(host))
            .await
    }

    pub async fn remote_access_id(&self, host: &str) -> Option<String> {
        self.bounded(host, "remote access id", self.remote.remote_access_id(host))
            .await
    }

    /// Run a remote query under the configured timeout, absorbing failures.
    async fn bounded<T, F>(&self, host: &str, query: &'static str, fut: F) -> Option<T>
    where
        F: std::future::Future<Output = Result<Option<T>>>,
    {
        metrics().host_probes.inc();
        let started = Instant::now();
        let outcome = timeout(self.config.query_timeout(), fut).await;
        metrics()
            .probe_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                metrics().host_probe_failures.inc();
                warn!(host, query, error = %e, "Host query failed");
                None
            }
            Err(_) => {
                metrics().host_probe_failures.inc();
                warn!(host, query, timeout_ms = self.config.query_timeout_ms, "Host query timed out");
                None
            }
        }
    }

    /// All three probes, run concurrently and cached per host.
    pub async fn record(&self, host: &str) -> HostRecord {
        let key = host.to_uppercase();
        if let Some(cached) = self.cache.get(&key).await {
            debug!(host, "Host record cache hit");
            return cached;
        }

        let (reachable, last_reboot_time, remote_access_id) = tokio::join!(
            self.is_reachable(host),
            self.last_reboot(host),
            self.remote_access_id(host),
        );
        let record = HostRecord {
            reachable,
            last_reboot_time,
            remote_access_id,
        };

        self.cache.insert(key, record.clone()).await;
        record
    }
}
