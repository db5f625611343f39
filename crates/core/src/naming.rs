//! Deterministic naming of every directory object owned by an environment.
//!
//! The convention is consumed by other systems and must not drift:
//! - production OU: `PROD_{UPPER(host)}`
//! - cloud OU: `CLOUD_{UPPER(host)}`
//! - security group: `RDS-{UPPER(host)}`
//! - username: `{lower(first min(3, len) chars of host)}{index}`

use serde::{Deserialize, Serialize};

/// Maximum number of host characters used for the username prefix.
pub const USERNAME_PREFIX_LEN: usize = 3;

/// Production OU name prefix.
pub const PRODUCTION_OU_PREFIX: &str = "PROD_";

/// Cloud OU name prefix.
pub const CLOUD_OU_PREFIX: &str = "CLOUD_";

/// Security group name prefix.
pub const GROUP_PREFIX: &str = "RDS-";

/// Names derived from a host identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentNames {
    pub host: String,
    pub production_ou: String,
    pub cloud_ou: String,
    pub group: String,
    pub username_prefix: String,
}

impl EnvironmentNames {
    pub fn for_host(host: &str) -> Self {
        let upper = host.to_uppercase();
        Self {
            host: host.to_string(),
            production_ou: format!("{PRODUCTION_OU_PREFIX}{upper}"),
            cloud_ou: format!("{CLOUD_OU_PREFIX}{upper}"),
            group: format!("{GROUP_PREFIX}{upper}"),
            username_prefix: username_prefix(host),
        }
    }

    /// Username for the given sequence index.
    pub fn username(&self, index: u32) -> String {
        format!("{}{}", self.username_prefix, index)
    }
}

/// Lowercase leading substring of the host identifier.
pub fn username_prefix(host: &str) -> String {
    host.chars()
        .take(USERNAME_PREFIX_LEN)
        .collect::<String>()
        .to_lowercase()
}

/// Recover the host identifier from a production OU name (`PROD_SRV01` -> `SRV01`).
pub fn host_from_production_ou(ou_name: &str) -> Option<&str> {
    let prefix_len = PRODUCTION_OU_PREFIX.len();
    if ou_name.len() > prefix_len
        && ou_name.is_char_boundary(prefix_len)
        && ou_name[..prefix_len].eq_ignore_ascii_case(PRODUCTION_OU_PREFIX)
    {
        Some(&ou_name[prefix_len..])
    } else {
        None
    }
}
