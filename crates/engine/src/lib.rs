//! Tenant environment provisioning.
//!
//! [`ProvisioningEngine`] builds an environment (production OU, cloud OU,
//! host move, security group, numbered accounts) and extends existing ones
//! with more accounts. [`ProvisioningQueue`] runs those calls on background
//! tasks under a deadline.

pub mod accounts;
pub mod allocator;
pub mod config;
pub mod engine;
pub mod jobs;
pub mod locks;
pub mod query;

pub use allocator::UserIndexAllocator;
pub use config::ProvisioningConfig;
pub use engine::ProvisioningEngine;
pub use jobs::{Job, JobOutput, ProvisioningQueue};
pub use locks::HostLocks;
