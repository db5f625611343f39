//! Directory client for the tenant provisioner.
//!
//! [`DirectoryClient`] offers idempotent create/move/membership operations on
//! top of a [`DirectoryBackend`]. Two backends ship: [`LdapDirectory`] talks
//! to Active Directory through `ldap3`, [`MemoryDirectory`] keeps everything
//! in process for dry runs and tests.

pub mod backend;
pub mod client;
pub mod config;
pub mod dn;
pub mod health;
pub mod ldap;
pub mod memory;
pub mod model;

pub use backend::DirectoryBackend;
pub use client::{AccountOutcome, DirectoryClient};
pub use config::DirectoryConfig;
pub use ldap::LdapDirectory;
pub use memory::MemoryDirectory;
pub use model::{AttributeChange, Attributes, DirectoryEntry, Filter, ObjectKind, Scope, SearchResults};
