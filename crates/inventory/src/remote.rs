//! Remote host queries served by the inventory agent.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use provisioner_core::{Error, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::InventoryConfig;

/// Metadata queries answered by the host itself.
///
/// `Ok(None)` means the host answered but has no value.
#[async_trait]
pub trait RemoteQuery: Send + Sync {
    /// Last boot time of the host's operating system.
    async fn last_boot_time(&self, host: &str) -> Result<Option<DateTime<Utc>>>;

    /// Identifier of the vendor remote-access client installed on the host (AnyDesk).
    async fn remote_access_id(&self, host: &str) -> Result<Option<String>>;

    /// Whether queries actually reach hosts.
    fn is_enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastBootResponse {
    last_boot_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteAccessResponse {
    anydesk_id: Option<String>,
}

/// HTTP client for the per-host inventory agent.
///
/// Runs in mock mode when no agent URL is configured: every query answers
/// `Ok(None)` without touching the network.
#[derive(Clone)]
pub struct AgentQuery {
    /// URL template (e.g., "http://{host}:8085")
    url_template: String,
    http_client: reqwest::Client,
    mock_mode: bool,
}

impl AgentQuery {
    /// Live client for the agent at `url_template`.
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(url_template.into(), timeout, false)
    }

    /// Agent that never queries hosts.
    pub fn disabled() -> Result<Self> {
        Self::build(String::new(), Duration::from_secs(1), true)
    }

    /// Live or disabled, depending on whether `config` names an agent URL.
    pub fn from_config(config: &InventoryConfig) -> Result<Self> {
        if config.agent_enabled() {
            Self::new(config.agent_url.clone(), config.query_timeout())
        } else {
            Self::disabled()
        }
    }

    fn build(url_template: String, timeout: Duration, mock_mode: bool) -> Result<Self> {
        let url_template = url_template.trim().trim_end_matches('/').to_string();

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url_template,
            http_client,
            mock_mode,
        })
    }

    fn url(&self, host: &str, path: &str) -> String {
        format!("{}{}", self.url_template.replace("{host}", host), path)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, host: &str, path: &str) -> Result<Option<T>> {
        let url = self.url(host, path);
        debug!(url = %url, "Querying inventory agent");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            warn!(host, error = %e, "Inventory agent request failed");
            Error::unreachable(host)
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(host, status = %status, body = %body, "Inventory agent returned error");
            return Err(Error::unexpected(format!(
                "Inventory agent on {} returned {}",
                host, status
            )));
        }

        let parsed: T = response.json().await.map_err(|e| {
            warn!(host, error = %e, "Failed to parse inventory agent response");
            Error::unexpected(format!("Invalid inventory agent response: {}", e))
        })?;

        Ok(Some(parsed))
    }
}

#[async_trait]
impl RemoteQuery for AgentQuery {
    async fn last_boot_time(&self, host: &str) -> Result<Option<DateTime<Utc>>> {
        if self.mock_mode {
            return Ok(None);
        }
        let response: Option<LastBootResponse> = self.get(host, "/system/last-boot").await?;
        Ok(response.and_then(|r| r.last_boot_time))
    }

    async fn remote_access_id(&self, host: &str) -> Result<Option<String>> {
        if self.mock_mode {
            return Ok(None);
        }
        let response: Option<RemoteAccessResponse> =
            self.get(host, "/registry/anydesk-id").await?;
        Ok(response
            .and_then(|r| r.anydesk_id)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    fn is_enabled(&self) -> bool {
        !self.mock_mode
    }
}
