//! Account lifecycle operations on provisioned users.

use provisioner_core::{AccountInfo, Result, UserCredential};
use tracing::info;

use crate::engine::ProvisioningEngine;

impl ProvisioningEngine {
    pub async fn account_info(&self, username: &str) -> Result<AccountInfo> {
        self.directory.account_info(username).await
    }

    pub async fn enable_user(&self, username: &str) -> Result<()> {
        self.directory.enable_user(username).await
    }

    pub async fn disable_user(&self, username: &str) -> Result<()> {
        self.directory.disable_user(username).await
    }

    /// Returns `false` when the account was not locked.
    pub async fn unlock_user(&self, username: &str) -> Result<bool> {
        self.directory.unlock_user(username).await
    }

    /// Set a new password, generating a passphrase when none is given.
    pub async fn reset_password(
        &self,
        username: &str,
        password: Option<String>,
    ) -> Result<UserCredential> {
        let password = password
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.credentials.generate());
        self.directory.reset_password(username, &password).await?;
        info!(username, "Password reset through engine");

        Ok(UserCredential {
            username: username.to_string(),
            password,
        })
    }
}
