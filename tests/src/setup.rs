//! Common test setup functions.

use std::sync::Arc;
use std::time::Duration;

use directory_client::{DirectoryBackend, DirectoryClient, DirectoryConfig, MemoryDirectory};
use host_inventory::{HostInventoryProbe, InventoryConfig};
use provisioner_core::{CredentialConfig, CredentialGenerator};
use provisioning_engine::{ProvisioningConfig, ProvisioningEngine, ProvisioningQueue};

use crate::fixtures::{COMPUTERS, HOST};
use crate::mocks::{MockRemoteQuery, SlowDirectory};

/// Test context wiring the real engine to an in-memory directory.
///
/// This exercises the production code paths by:
/// - Using the real `ProvisioningEngine` and `DirectoryClient`
/// - Using `MemoryDirectory`, which implements the same `DirectoryBackend` trait as LDAP
/// - Using `MockRemoteQuery` in place of the host inventory agent
pub struct TestContext {
    pub memory: Arc<MemoryDirectory>,
    pub remote: MockRemoteQuery,
    pub directory: DirectoryClient,
    pub engine: Arc<ProvisioningEngine>,
}

impl TestContext {
    /// Directory layout in place and `SRV01` waiting in the computers container.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Same as [`TestContext::new`] but every directory call takes `delay`.
    pub fn with_latency(delay: Duration) -> Self {
        Self::build(Some(delay))
    }

    fn build(delay: Option<Duration>) -> Self {
        let config = DirectoryConfig::default();
        let memory = Arc::new(MemoryDirectory::with_layout(&config));
        memory.add_computer(HOST, COMPUTERS);

        let backend: Arc<dyn DirectoryBackend> = match delay {
            Some(delay) => Arc::new(SlowDirectory::new(memory.clone(), delay)),
            None => memory.clone() as Arc<dyn DirectoryBackend>,
        };
        let directory = DirectoryClient::new(backend, config);

        let remote = MockRemoteQuery::new();
        let probe = HostInventoryProbe::new(test_inventory_config(), Arc::new(remote.clone()));

        let engine = Arc::new(ProvisioningEngine::new(
            directory.clone(),
            probe,
            CredentialGenerator::new(&CredentialConfig::default()),
        ));

        Self {
            memory,
            remote,
            directory,
            engine,
        }
    }

    /// Add another host waiting to be provisioned.
    pub fn add_host(&self, host: &str) -> String {
        self.memory.add_computer(host, COMPUTERS)
    }

    /// Start a job queue in front of the engine.
    pub fn queue(&self, config: &ProvisioningConfig) -> ProvisioningQueue {
        let (queue, _worker) = ProvisioningQueue::start(self.engine.clone(), config);
        queue
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Inventory settings that fail fast: no host answers on port 1.
pub fn test_inventory_config() -> InventoryConfig {
    InventoryConfig {
        ports: vec![1],
        reachability_timeout_ms: 100,
        query_timeout_ms: 200,
        ..InventoryConfig::default()
    }
}
