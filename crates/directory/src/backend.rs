//! Capability interface every directory backend implements.

use async_trait::async_trait;
use provisioner_core::Result;

use crate::model::{AttributeChange, Attributes, Filter, ObjectKind, Scope, SearchResults};

/// Raw directory capabilities, polymorphic over [`ObjectKind`].
///
/// Backends do not implement idempotency; [`crate::DirectoryClient`] layers the
/// "return the existing object" contract on top of these operations.
#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    /// Create `{rdn_type}={name},{parent}` and return its DN.
    ///
    /// Fails with `AlreadyExists` if the DN is taken and `NotFound` if the
    /// parent does not exist.
    async fn create_child(
        &self,
        kind: ObjectKind,
        name: &str,
        parent: &str,
        attributes: Attributes,
    ) -> Result<String>;

    /// Search below `base`. An empty attribute list returns all user attributes.
    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<SearchResults>;

    /// Apply attribute changes to an existing entry.
    async fn modify(&self, dn: &str, changes: Vec<AttributeChange>) -> Result<()>;

    /// Move an entry (and its subtree) under `new_parent`, returning the new DN.
    async fn move_entry(&self, dn: &str, new_parent: &str) -> Result<String>;

    /// Set an account password.
    async fn set_password(&self, dn: &str, password: &str) -> Result<()>;

    /// Verify the backend is reachable and the bind is accepted.
    async fn check_connection(&self) -> Result<()>;
}
