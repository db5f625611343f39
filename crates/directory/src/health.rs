//! Directory health checks.

use provisioner_core::{Error, ObjectRef, Result};
use telemetry::health;
use tracing::{debug, error};

use crate::client::DirectoryClient;

/// Check the directory connection and record the outcome in the health registry.
pub async fn check_connection(client: &DirectoryClient) -> bool {
    match client.check_connection().await {
        Ok(()) => {
            debug!("Directory connection healthy");
            health().directory.set_healthy();
            true
        }
        Err(e) => {
            error!("Directory health check failed: {}", e);
            health().directory.set_unhealthy(e.to_string());
            false
        }
    }
}

/// Verify the containers provisioning writes into exist.
pub async fn verify_layout(client: &DirectoryClient) -> Result<()> {
    let config = client.config();
    for container in [
        &config.tenant_root,
        &config.infrastructure_root,
        &config.groups_container,
    ] {
        client.read_entry(container, &["distinguishedName"]).await.map_err(|e| {
            if e.is_not_found() {
                Error::not_found(ObjectRef::OrganizationalUnit, container.as_str())
            } else {
                e
            }
        })?;
    }

    debug!("Directory layout verified");
    Ok(())
}
