//! Environment provisioning workflows.

use std::ops::RangeInclusive;
use std::time::Instant;

use directory_client::{dn, AccountOutcome, DirectoryClient, ObjectKind};
use host_inventory::HostInventoryProbe;
use provisioner_core::{
    AccountFailure, CreateEnvironmentRequest, CreateUsersRequest, CredentialGenerator,
    EnvironmentNames, EnvironmentResult, Error, ObjectRef, Result, UserCredential, UsersResult,
};
use telemetry::metrics;
use tracing::{error, info, instrument, warn};

use crate::allocator::UserIndexAllocator;
use crate::locks::HostLocks;

/// Orchestrates directory, credential and inventory components.
///
/// Structural steps (OUs, host move, group) abort the call on failure.
/// Accounts are provisioned one at a time; a failed account is recorded in
/// the result and the loop moves on. Nothing already created is rolled back.
#[derive(Clone)]
pub struct ProvisioningEngine {
    pub(crate) directory: DirectoryClient,
    pub(crate) probe: HostInventoryProbe,
    pub(crate) credentials: CredentialGenerator,
    allocator: UserIndexAllocator,
    locks: HostLocks,
}

/// Mark a structural step failure before propagating it.
fn structural<T>(step: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        metrics().structural_failures.inc();
        error!(step, error = %e, "Structural provisioning step failed");
        e
    })
}

impl ProvisioningEngine {
    pub fn new(
        directory: DirectoryClient,
        probe: HostInventoryProbe,
        credentials: CredentialGenerator,
    ) -> Self {
        Self {
            allocator: UserIndexAllocator::new(directory.clone()),
            directory,
            probe,
            credentials,
            locks: HostLocks::new(),
        }
    }

    pub fn directory(&self) -> &DirectoryClient {
        &self.directory
    }

    pub fn locks(&self) -> &HostLocks {
        &self.locks
    }

    /// Path of the production OU for `names`, whether or not it exists.
    pub fn production_ou_path(&self, names: &EnvironmentNames) -> String {
        format!(
            "OU={},{}",
            dn::escape_dn_value(&names.production_ou),
            self.directory.config().tenant_root
        )
    }

    /// Build a complete tenant environment around an existing host.
    #[instrument(skip(self, request), fields(host = %request.host_identifier, users = request.user_count))]
    pub async fn create_environment(
        &self,
        request: &CreateEnvironmentRequest,
    ) -> Result<EnvironmentResult> {
        request.check()?;
        let names = request.names();
        let config = self.directory.config();
        let started = Instant::now();

        let _guard = self.locks.acquire(&names.host).await;

        let production_ou_path = structural(
            "production OU",
            self.directory
                .create_organizational_unit(&names.production_ou, &config.tenant_root)
                .await,
        )?;
        structural(
            "production OU audit fields",
            self.directory
                .set_attributes_if_absent(
                    &production_ou_path,
                    &[
                        ("description", request.tenant_name.as_str()),
                        ("info", request.requested_by.as_str()),
                    ],
                )
                .await,
        )?;

        let cloud_ou_path = structural(
            "cloud OU",
            self.directory
                .create_organizational_unit(&names.cloud_ou, &config.infrastructure_root)
                .await,
        )?;

        structural(
            "host move",
            self.directory
                .move_object(ObjectKind::Computer, &names.host, &cloud_ou_path)
                .await,
        )?;

        structural(
            "security group",
            self.directory
                .create_security_group(
                    &names.group,
                    &config.groups_container,
                    &request.tenant_name,
                    &request.requested_by,
                )
                .await,
        )?;

        let accounts = self
            .provision_accounts(
                &names,
                1..=request.user_count,
                &production_ou_path,
                &request.tenant_name,
                &request.requested_by,
            )
            .await;

        let host_remote_id = self.probe.remote_access_id(&names.host).await;

        metrics().environments_created.inc();
        info!(
            created = accounts.created_users.len(),
            failed = accounts.failed_users.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Environment provisioned"
        );

        Ok(EnvironmentResult {
            tenant_name: request.tenant_name.clone(),
            host_identifier: request.host_identifier.clone(),
            production_ou_path,
            cloud_ou_path,
            group_name: names.group,
            created_users: accounts.created_users,
            failed_users: accounts.failed_users,
            host_remote_id,
        })
    }

    /// Add accounts to an existing environment, continuing after the highest index.
    #[instrument(skip(self, request), fields(host = %request.host_identifier, users = request.user_count))]
    pub async fn create_additional_users(&self, request: &CreateUsersRequest) -> Result<UsersResult> {
        request.check()?;
        let names = request.names();

        let _guard = self.locks.acquire(&names.host).await;

        let production_ou_path = self.production_ou_path(&names);
        let production_ou = self
            .directory
            .read_entry(&production_ou_path, &["description"])
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Error::not_found(ObjectRef::OrganizationalUnit, names.production_ou.as_str())
                } else {
                    e
                }
            })?;
        let tenant_name = production_ou.non_empty("description").unwrap_or_default();

        let start = self
            .allocator
            .next_index(&production_ou_path, &names.username_prefix)
            .await?;
        let end = start
            .checked_add(request.user_count - 1)
            .ok_or_else(|| Error::validation("account index space exhausted"))?;

        let accounts = self
            .provision_accounts(
                &names,
                start..=end,
                &production_ou_path,
                &tenant_name,
                &request.requested_by,
            )
            .await;

        info!(
            start,
            created = accounts.created_users.len(),
            failed = accounts.failed_users.len(),
            "Additional accounts provisioned"
        );
        Ok(accounts)
    }

    /// Create, credential and enroll one account per index.
    async fn provision_accounts(
        &self,
        names: &EnvironmentNames,
        indices: RangeInclusive<u32>,
        ou_path: &str,
        description: &str,
        created_by: &str,
    ) -> UsersResult {
        let mut result = UsersResult::default();

        for index in indices {
            let username = names.username(index);
            let password = self.credentials.generate();

            match self
                .directory
                .create_user_account(&username, &password, ou_path, description, created_by)
                .await
            {
                Ok(AccountOutcome::Created(_)) => {
                    if !self.directory.add_member_to_group(&username, &names.group).await {
                        metrics().membership_failures.inc();
                    }
                    metrics().accounts_created.inc();
                    result.created_users.push(UserCredential { username, password });
                }
                Ok(AccountOutcome::AlreadyExisted(dn)) => {
                    metrics().accounts_existing.inc();
                    warn!(username = %username, dn = %dn, "Account already exists, password left unchanged");
                    result.failed_users.push(AccountFailure {
                        username,
                        reason: "account already exists".to_string(),
                    });
                }
                Err(e) => {
                    metrics().account_failures.inc();
                    warn!(username = %username, error = %e, "Account provisioning failed, continuing");
                    result.failed_users.push(AccountFailure {
                        username,
                        reason: e.to_string(),
                    });
                }
            }
        }

        result
    }
}
