//! Directory service configuration.

use serde::{Deserialize, Serialize};

/// Directory connection parameters and container layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// LDAP URL (ldap:// or ldaps://)
    pub url: String,
    /// Bind DN (or UPN) of the service account
    #[serde(default)]
    pub bind_dn: String,
    /// Bind password (optional for anonymous reads)
    pub bind_password: Option<String>,
    /// Search base covering every managed object
    #[serde(default = "default_base_dn")]
    pub base_dn: String,
    /// Container holding the tenants' production OUs
    #[serde(default = "default_tenant_root")]
    pub tenant_root: String,
    /// Container holding the hosting servers' cloud OUs
    #[serde(default = "default_infrastructure_root")]
    pub infrastructure_root: String,
    /// Container holding the per-environment security groups
    #[serde(default = "default_groups_container")]
    pub groups_container: String,
    /// DNS domain used for userPrincipalName suffixes
    #[serde(default = "default_domain_name")]
    pub domain_name: String,
    /// Per-operation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Entries per page for paged searches; keep below the server's MaxPageSize
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    /// Upgrade plain ldap:// connections with StartTLS
    #[serde(default)]
    pub use_starttls: bool,
    /// Skip TLS certificate verification (lab domains only)
    #[serde(default)]
    pub tls_skip_verify: bool,
}

fn default_base_dn() -> String {
    "DC=labs,DC=local".to_string()
}

fn default_tenant_root() -> String {
    "OU=Clinic,DC=labs,DC=local".to_string()
}

fn default_infrastructure_root() -> String {
    "OU=Servers,DC=labs,DC=local".to_string()
}

fn default_groups_container() -> String {
    "OU=Groups,DC=labs,DC=local".to_string()
}

fn default_domain_name() -> String {
    "labs.local".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> i32 {
    500
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: "ldap://localhost:389".to_string(),
            bind_dn: String::new(),
            bind_password: None,
            base_dn: default_base_dn(),
            tenant_root: default_tenant_root(),
            infrastructure_root: default_infrastructure_root(),
            groups_container: default_groups_container(),
            domain_name: default_domain_name(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
            use_starttls: false,
            tls_skip_verify: false,
        }
    }
}

impl DirectoryConfig {
    /// Whether the connection is encrypted, which AD requires for password writes.
    pub fn is_secure(&self) -> bool {
        self.url.starts_with("ldaps://") || self.use_starttls
    }
}
