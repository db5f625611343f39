//! Host inventory probes for the tenant provisioner.
//!
//! Reachability is a plain TCP check; last reboot time and the remote-access
//! identifier come from a per-host inventory agent behind [`RemoteQuery`].
//! Nothing here ever fails a provisioning call.

pub mod config;
pub mod probe;
pub mod remote;

pub use config::InventoryConfig;
pub use probe::HostInventoryProbe;
pub use remote::{AgentQuery, RemoteQuery};

use telemetry::health;
use tracing::info;

/// Record the inventory component's state in the health registry.
pub fn record_health(probe: &HostInventoryProbe) {
    if probe.remote_enabled() {
        health().inventory.set_healthy();
    } else {
        info!("Inventory agent not configured, remote host lookups disabled");
        health()
            .inventory
            .set_unhealthy("inventory agent not configured; remote lookups disabled");
    }
}
