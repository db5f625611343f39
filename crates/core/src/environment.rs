//! Results returned to callers of the provisioning engine.
//!
//! Everything here is serialized (camelCase) and forwarded by external
//! collaborators such as reporting or a request layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A generated account and its initial password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredential {
    pub username: String,
    pub password: String,
}

/// An account that could not be created; the rest of the batch continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFailure {
    pub username: String,
    pub reason: String,
}

/// Outcome of creating a tenant environment.
///
/// Accounts created before a later failure are not rolled back; callers see
/// every account that exists in `created_users` and every skipped one in
/// `failed_users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentResult {
    pub tenant_name: String,
    pub host_identifier: String,
    #[serde(rename = "productionOUPath")]
    pub production_ou_path: String,
    #[serde(rename = "cloudOUPath")]
    pub cloud_ou_path: String,
    pub group_name: String,
    pub created_users: Vec<UserCredential>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_users: Vec<AccountFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_remote_id: Option<String>,
}

/// Outcome of extending an environment with more accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResult {
    pub created_users: Vec<UserCredential>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_users: Vec<AccountFailure>,
}

impl UsersResult {
    /// The credential list returned at the boundary.
    pub fn into_credentials(self) -> Vec<UserCredential> {
        self.created_users
    }

    pub fn is_complete(&self) -> bool {
        self.failed_users.is_empty()
    }
}

/// Best-effort facts about a host. Absent values are normal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    pub reachable: bool,
    pub last_reboot_time: Option<DateTime<Utc>>,
    pub remote_access_id: Option<String>,
}

/// Read-only summary of an existing environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub host_identifier: String,
    pub tenant_name: Option<String>,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub user_count: usize,
    /// Container currently holding the host's computer object
    pub computer_container: Option<String>,
    /// Probe results; absent when the host has no computer object
    pub host: Option<HostRecord>,
}

/// One entry of the environment listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSummary {
    pub host_identifier: String,
    pub tenant_name: Option<String>,
}

/// An infrastructure host and what the probes found out about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStatus {
    pub name: String,
    #[serde(flatten)]
    pub record: HostRecord,
}

/// State of a single user account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub username: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub disabled: bool,
    pub locked: bool,
    pub groups: Vec<String>,
}
