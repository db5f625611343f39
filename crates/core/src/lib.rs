//! Core types, naming, validation and credential generation for the tenant provisioner.

pub mod credentials;
pub mod environment;
pub mod error;
pub mod limits;
pub mod naming;
pub mod tenant;

pub use credentials::{CredentialConfig, CredentialGenerator};
pub use environment::*;
pub use error::{Error, ObjectRef, Result};
pub use naming::EnvironmentNames;
pub use tenant::*;
