//! Provisioning engine configuration.

use std::time::Duration;

use provisioner_core::limits::DEFAULT_JOB_DEADLINE_SECS;
use serde::{Deserialize, Serialize};

/// Job execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Deadline applied to a job when the caller does not supply one
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Jobs that may wait for the worker before submissions are rejected
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_deadline_secs() -> u64 {
    DEFAULT_JOB_DEADLINE_SECS
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl ProvisioningConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}
