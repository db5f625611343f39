//! Test fixtures and request builders.

use provisioner_core::{CreateEnvironmentRequest, CreateUsersRequest};

pub const TENANT: &str = "Acme Clinic";
pub const HOST: &str = "SRV01";
pub const REQUESTED_BY: &str = "admin";

/// Container new computer objects land in before provisioning.
pub const COMPUTERS: &str = "CN=Computers,DC=labs,DC=local";

pub const PRODUCTION_OU: &str = "OU=PROD_SRV01,OU=Clinic,DC=labs,DC=local";
pub const CLOUD_OU: &str = "OU=CLOUD_SRV01,OU=Servers,DC=labs,DC=local";

/// Environment request for the default tenant and host.
pub fn environment_request(users: u32) -> CreateEnvironmentRequest {
    CreateEnvironmentRequest::new(TENANT, HOST, users, REQUESTED_BY)
}

/// Environment request for another host.
pub fn environment_request_for(host: &str, users: u32) -> CreateEnvironmentRequest {
    CreateEnvironmentRequest::new(format!("Tenant {host}"), host, users, REQUESTED_BY)
}

pub fn users_request(users: u32) -> CreateUsersRequest {
    CreateUsersRequest::new(HOST, users, REQUESTED_BY)
}

/// Usernames in creation order.
pub fn usernames(credentials: &[provisioner_core::UserCredential]) -> Vec<String> {
    credentials.iter().map(|c| c.username.clone()).collect()
}
