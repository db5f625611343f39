//! Provisioning requests for tenant environments.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::limits::MAX_HOST_IDENTIFIER_LEN;
use crate::naming::EnvironmentNames;

/// Request to create a new tenant environment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvironmentRequest {
    /// Tenant display name
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub tenant_name: String,
    /// Host (computer object) name the environment is built around
    #[validate(custom(function = "host_identifier"))]
    pub host_identifier: String,
    /// Number of user accounts to create
    #[validate(range(min = 1, max = 500))]
    pub user_count: u32,
    /// Identity recorded in the audit fields of every created object
    #[validate(custom(function = "not_blank"))]
    pub requested_by: String,
}

/// Request to extend an existing environment with more accounts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUsersRequest {
    #[validate(custom(function = "host_identifier"))]
    pub host_identifier: String,
    #[validate(range(min = 1, max = 500))]
    pub user_count: u32,
    #[validate(custom(function = "not_blank"))]
    pub requested_by: String,
}

impl CreateEnvironmentRequest {
    pub fn new(
        tenant_name: impl Into<String>,
        host_identifier: impl Into<String>,
        user_count: u32,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            tenant_name: tenant_name.into(),
            host_identifier: host_identifier.into(),
            user_count,
            requested_by: requested_by.into(),
        }
    }

    /// Validates the request, returning `Error::Validation` on failure.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }

    pub fn names(&self) -> EnvironmentNames {
        EnvironmentNames::for_host(&self.host_identifier)
    }
}

impl CreateUsersRequest {
    pub fn new(
        host_identifier: impl Into<String>,
        user_count: u32,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            host_identifier: host_identifier.into(),
            user_count,
            requested_by: requested_by.into(),
        }
    }

    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }

    pub fn names(&self) -> EnvironmentNames {
        EnvironmentNames::for_host(&self.host_identifier)
    }
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Host identifiers end up inside DNs and sAMAccountNames, so only NetBIOS-safe
/// characters are accepted.
fn host_identifier(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() || value.len() > MAX_HOST_IDENTIFIER_LEN {
        return Err(ValidationError::new("host_identifier_length"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::new("host_identifier_charset"));
    }
    Ok(())
}
