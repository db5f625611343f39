//! Idempotent directory operations used by the provisioning engine.

use std::sync::Arc;

use provisioner_core::{AccountInfo, Error, ObjectRef, Result};
use tracing::{debug, info, instrument, warn};

use crate::backend::DirectoryBackend;
use crate::config::DirectoryConfig;
use crate::dn::{dn_eq, parent_dn, rdn_value};
use crate::ldap::LdapDirectory;
use crate::model::{AttributeChange, DirectoryEntry, Filter, ObjectKind, Scope, SearchResults};

/// `userAccountControl`: account disabled.
pub const UF_ACCOUNTDISABLE: i64 = 0x2;
/// `userAccountControl`: normal user account.
pub const UF_NORMAL_ACCOUNT: i64 = 0x200;
/// `userAccountControl`: password never expires.
pub const UF_DONT_EXPIRE_PASSWD: i64 = 0x10000;
/// `groupType` of a global security group.
pub const GLOBAL_SECURITY_GROUP: i64 = -2147483646;

/// Outcome of an idempotent account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Created(String),
    AlreadyExisted(String),
}

impl AccountOutcome {
    pub fn dn(&self) -> &str {
        match self {
            Self::Created(dn) | Self::AlreadyExisted(dn) => dn,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

fn attribute(name: &str, value: impl Into<String>) -> (String, Vec<String>) {
    (name.to_string(), vec![value.into()])
}

/// Push `name` only when `value` is non-empty.
fn optional_attribute(attrs: &mut Vec<(String, Vec<String>)>, name: &str, value: &str) {
    if !value.trim().is_empty() {
        attrs.push(attribute(name, value));
    }
}

/// Directory client layering the "return the existing object" contract over a backend.
#[derive(Clone)]
pub struct DirectoryClient {
    backend: Arc<dyn DirectoryBackend>,
    config: DirectoryConfig,
}

impl DirectoryClient {
    pub fn new(backend: Arc<dyn DirectoryBackend>, config: DirectoryConfig) -> Self {
        Self { backend, config }
    }

    /// Client over an LDAP connection described by `config`.
    pub fn ldap(config: DirectoryConfig) -> Self {
        let backend = Arc::new(LdapDirectory::new(config.clone()));
        Self::new(backend, config)
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn DirectoryBackend> {
        &self.backend
    }

    /// DN of a direct child of `parent` with the given kind and name.
    async fn find_child(&self, kind: ObjectKind, name: &str, parent: &str) -> Result<Option<String>> {
        let mut results = self
            .backend
            .search(parent, Scope::OneLevel, &kind.named(name), &["distinguishedName"])
            .await?;
        Ok(results.next().map(|entry| entry.dn))
    }

    /// Find an object of `kind` anywhere below the search base.
    pub async fn locate(&self, kind: ObjectKind, name: &str) -> Result<Option<DirectoryEntry>> {
        let mut results = self
            .backend
            .search(&self.config.base_dn, Scope::Subtree, &kind.named(name), &[])
            .await?;
        Ok(results.next())
    }

    /// Create an OU under `parent`, or return the path of the existing one.
    #[instrument(skip(self))]
    pub async fn create_organizational_unit(&self, name: &str, parent: &str) -> Result<String> {
        if let Some(existing) = self.find_child(ObjectKind::OrganizationalUnit, name, parent).await? {
            debug!(dn = %existing, "Organizational unit already exists");
            return Ok(existing);
        }

        match self
            .backend
            .create_child(ObjectKind::OrganizationalUnit, name, parent, Vec::new())
            .await
        {
            Ok(dn) => {
                info!(dn = %dn, "Created organizational unit");
                Ok(dn)
            }
            Err(e) if e.is_already_exists() => self
                .find_child(ObjectKind::OrganizationalUnit, name, parent)
                .await?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    /// Create a global security group in `ou_path` unless one with that name exists there.
    #[instrument(skip(self, description, created_by))]
    pub async fn create_security_group(
        &self,
        name: &str,
        ou_path: &str,
        description: &str,
        created_by: &str,
    ) -> Result<String> {
        if let Some(existing) = self.find_child(ObjectKind::Group, name, ou_path).await? {
            info!(dn = %existing, "Security group already exists, skipping creation");
            return Ok(existing);
        }

        let mut attrs = vec![
            attribute("sAMAccountName", name),
            attribute("groupType", GLOBAL_SECURITY_GROUP.to_string()),
        ];
        optional_attribute(&mut attrs, "description", description);
        optional_attribute(&mut attrs, "info", created_by);

        let dn = self
            .backend
            .create_child(ObjectKind::Group, name, ou_path, attrs)
            .await?;
        info!(dn = %dn, "Created security group");
        Ok(dn)
    }

    /// Create an enabled user account with a non-expiring password.
    ///
    /// Account names are unique domain-wide, so an existing account anywhere
    /// below the search base is reported as [`AccountOutcome::AlreadyExisted`].
    #[instrument(skip(self, password, description, created_by))]
    pub async fn create_user_account(
        &self,
        username: &str,
        password: &str,
        ou_path: &str,
        description: &str,
        created_by: &str,
    ) -> Result<AccountOutcome> {
        if let Some(existing) = self.locate(ObjectKind::User, username).await? {
            info!(dn = %existing.dn, "User account already exists, skipping creation");
            return Ok(AccountOutcome::AlreadyExisted(existing.dn));
        }

        let mut attrs = vec![
            attribute("sAMAccountName", username),
            attribute(
                "userPrincipalName",
                format!("{}@{}", username, self.config.domain_name),
            ),
            attribute("displayName", username.to_uppercase()),
        ];
        optional_attribute(&mut attrs, "description", description);
        optional_attribute(&mut attrs, "info", created_by);

        let dn = self
            .backend
            .create_child(ObjectKind::User, username, ou_path, attrs)
            .await?;

        self.backend.set_password(&dn, password).await?;

        let current = self
            .read_entry(&dn, &["userAccountControl"])
            .await?
            .int("userAccountControl")
            .unwrap_or(UF_NORMAL_ACCOUNT | UF_ACCOUNTDISABLE);
        let flags = (current & !UF_ACCOUNTDISABLE) | UF_DONT_EXPIRE_PASSWD;
        self.backend
            .modify(
                &dn,
                vec![AttributeChange::Replace(
                    "userAccountControl".to_string(),
                    vec![flags.to_string()],
                )],
            )
            .await?;

        info!(dn = %dn, "Created user account");
        Ok(AccountOutcome::Created(dn))
    }

    /// Move the named object into `destination`, returning its new path.
    #[instrument(skip(self))]
    pub async fn move_object(
        &self,
        kind: ObjectKind,
        name: &str,
        destination: &str,
    ) -> Result<String> {
        let entry = self
            .locate(kind, name)
            .await?
            .ok_or_else(|| Error::not_found(kind.object_ref(), name))?;

        if parent_dn(&entry.dn).is_some_and(|parent| dn_eq(parent, destination)) {
            debug!(dn = %entry.dn, "Object already in destination");
            return Ok(entry.dn);
        }

        let moved = self.backend.move_entry(&entry.dn, destination).await?;
        info!(from = %entry.dn, to = %moved, "Moved directory object");
        Ok(moved)
    }

    /// Add a user to a group. Best-effort: failures are logged and reported as `false`.
    #[instrument(skip(self))]
    pub async fn add_member_to_group(&self, username: &str, group_name: &str) -> bool {
        let user = match self.locate(ObjectKind::User, username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("User not found, cannot add to group");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "User lookup failed, cannot add to group");
                return false;
            }
        };
        let group = match self.locate(ObjectKind::Group, group_name).await {
            Ok(Some(group)) => group,
            Ok(None) => {
                warn!("Group not found, cannot add member");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Group lookup failed, cannot add member");
                return false;
            }
        };

        if group.values("member").iter().any(|m| dn_eq(m, &user.dn)) {
            debug!("User already a member of group");
            return true;
        }

        let change = AttributeChange::Add("member".to_string(), vec![user.dn.clone()]);
        match self.backend.modify(&group.dn, vec![change]).await {
            Ok(()) => {
                debug!(group = %group.dn, "Added user to group");
                true
            }
            Err(e) if e.is_already_exists() => true,
            Err(e) => {
                warn!(error = %e, "Failed to add user to group");
                false
            }
        }
    }

    /// Search below `base`.
    pub async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<SearchResults> {
        self.backend.search(base, scope, filter, attributes).await
    }

    /// Read a single entry by path.
    pub async fn read_entry(&self, dn: &str, attributes: &[&str]) -> Result<DirectoryEntry> {
        self.backend
            .search(dn, Scope::Base, &Filter::present("objectClass"), attributes)
            .await?
            .next()
            .ok_or_else(|| Error::not_found(ObjectRef::Entry, dn))
    }

    /// Write each attribute that is currently absent or empty; present values are left alone.
    pub async fn set_attributes_if_absent(&self, dn: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let names: Vec<&str> = attributes.iter().map(|(name, _)| *name).collect();
        let entry = self.read_entry(dn, &names).await?;

        let changes: Vec<AttributeChange> = attributes
            .iter()
            .filter(|(name, value)| entry.non_empty(name).is_none() && !value.trim().is_empty())
            .map(|(name, value)| AttributeChange::Replace(name.to_string(), vec![value.to_string()]))
            .collect();

        if changes.is_empty() {
            return Ok(());
        }
        debug!(dn, count = changes.len(), "Filling absent attributes");
        self.backend.modify(dn, changes).await
    }

    /// Look a user account up by `sAMAccountName`.
    pub async fn find_user(&self, username: &str) -> Result<DirectoryEntry> {
        self.locate(ObjectKind::User, username)
            .await?
            .ok_or_else(|| Error::not_found(ObjectRef::User, username))
    }

    pub async fn account_info(&self, username: &str) -> Result<AccountInfo> {
        let entry = self.find_user(username).await?;
        let flags = entry.int("userAccountControl").unwrap_or(UF_NORMAL_ACCOUNT);

        Ok(AccountInfo {
            username: entry
                .non_empty("sAMAccountName")
                .unwrap_or_else(|| username.to_string()),
            display_name: entry.non_empty("displayName"),
            description: entry.non_empty("description"),
            created_by: entry.non_empty("info"),
            disabled: flags & UF_ACCOUNTDISABLE != 0,
            locked: entry.int("lockoutTime").unwrap_or(0) > 0,
            groups: entry.values("memberOf").iter().map(|g| rdn_value(g)).collect(),
        })
    }

    async fn update_flags(&self, dn: &str, flags: i64) -> Result<()> {
        self.backend
            .modify(
                dn,
                vec![AttributeChange::Replace(
                    "userAccountControl".to_string(),
                    vec![flags.to_string()],
                )],
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn enable_user(&self, username: &str) -> Result<()> {
        let entry = self.find_user(username).await?;
        let flags = match entry.int("userAccountControl") {
            Some(flags) => flags & !UF_ACCOUNTDISABLE,
            None => {
                warn!("userAccountControl missing, assigning a normal enabled account");
                UF_NORMAL_ACCOUNT
            }
        };
        self.update_flags(&entry.dn, flags).await?;
        info!("User enabled");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn disable_user(&self, username: &str) -> Result<()> {
        let entry = self.find_user(username).await?;
        let flags = entry.int("userAccountControl").unwrap_or(UF_NORMAL_ACCOUNT);
        if flags & UF_ACCOUNTDISABLE != 0 {
            info!("User already disabled");
            return Ok(());
        }
        self.update_flags(&entry.dn, flags | UF_ACCOUNTDISABLE).await?;
        info!("User disabled");
        Ok(())
    }

    /// Clear a lockout. Returns `false` when the account was not locked.
    #[instrument(skip(self))]
    pub async fn unlock_user(&self, username: &str) -> Result<bool> {
        let entry = self.find_user(username).await?;
        if entry.int("lockoutTime").unwrap_or(0) <= 0 {
            info!("User is not locked");
            return Ok(false);
        }
        self.backend
            .modify(
                &entry.dn,
                vec![AttributeChange::Replace(
                    "lockoutTime".to_string(),
                    vec!["0".to_string()],
                )],
            )
            .await?;
        info!("User unlocked");
        Ok(true)
    }

    #[instrument(skip(self, password))]
    pub async fn reset_password(&self, username: &str, password: &str) -> Result<()> {
        let entry = self.find_user(username).await?;
        self.backend.set_password(&entry.dn, password).await?;
        info!("Password reset");
        Ok(())
    }

    pub async fn check_connection(&self) -> Result<()> {
        self.backend.check_connection().await
    }
}
