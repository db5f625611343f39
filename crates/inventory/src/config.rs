//! Host inventory configuration.

use std::time::Duration;

use provisioner_core::limits::{DEFAULT_REACHABILITY_TIMEOUT_MS, DEFAULT_REMOTE_QUERY_TIMEOUT_MS};
use serde::{Deserialize, Serialize};

/// Ports tried when checking whether a Windows host answers (RDP, SMB, RPC).
pub const DEFAULT_PROBE_PORTS: [u16; 3] = [3389, 445, 135];

/// Host inventory probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// TCP ports tried for reachability
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,
    /// Total budget for a reachability check
    #[serde(default = "default_reachability_timeout_ms")]
    pub reachability_timeout_ms: u64,
    /// Budget for each remote agent query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Agent URL template, `{host}` is replaced by the host name.
    /// Empty disables remote queries.
    #[serde(default)]
    pub agent_url: String,
    /// How long a full host record stays cached
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_ports() -> Vec<u16> {
    DEFAULT_PROBE_PORTS.to_vec()
}

fn default_reachability_timeout_ms() -> u64 {
    DEFAULT_REACHABILITY_TIMEOUT_MS
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_REMOTE_QUERY_TIMEOUT_MS
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_cache_capacity() -> u64 {
    1_000
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            ports: default_ports(),
            reachability_timeout_ms: default_reachability_timeout_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            agent_url: String::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl InventoryConfig {
    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_millis(self.reachability_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Whether remote agent queries are configured.
    pub fn agent_enabled(&self) -> bool {
        let url = self.agent_url.trim();
        !url.is_empty() && url != "mock"
    }
}
