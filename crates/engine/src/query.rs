//! Read-only views over provisioned environments and hosts.

use directory_client::{dn, Filter, ObjectKind, Scope};
use provisioner_core::naming::{host_from_production_ou, PRODUCTION_OU_PREFIX};
use provisioner_core::{
    EnvironmentInfo, EnvironmentNames, EnvironmentSummary, Error, HostStatus, ObjectRef, Result,
};
use tokio::task::JoinSet;
use tracing::debug;

use crate::engine::ProvisioningEngine;

impl ProvisioningEngine {
    /// Summarize one environment: audit fields, account count, where its host lives.
    pub async fn describe_environment(&self, host: &str) -> Result<EnvironmentInfo> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::validation("host identifier must not be blank"));
        }
        let names = EnvironmentNames::for_host(host);
        let production_ou_path = self.production_ou_path(&names);

        let production_ou = match self
            .directory
            .read_entry(&production_ou_path, &["description", "info", "whenCreated"])
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let computer = self.directory.locate(ObjectKind::Computer, host).await?;

        if production_ou.is_none() && computer.is_none() {
            return Err(Error::not_found(ObjectRef::Entry, host));
        }

        let user_count = match production_ou {
            Some(_) => self
                .directory
                .search(
                    &production_ou_path,
                    Scope::OneLevel,
                    &ObjectKind::User.filter(),
                    &["sAMAccountName"],
                )
                .await?
                .len(),
            None => 0,
        };

        let host_record = match computer {
            Some(_) => Some(self.probe.record(host).await),
            None => None,
        };

        Ok(EnvironmentInfo {
            host_identifier: host.to_uppercase(),
            tenant_name: production_ou.as_ref().and_then(|e| e.non_empty("description")),
            created_by: production_ou.as_ref().and_then(|e| e.non_empty("info")),
            created_at: production_ou.as_ref().and_then(|e| e.timestamp("whenCreated")),
            user_count,
            computer_container: computer
                .as_ref()
                .and_then(|c| dn::parent_dn(&c.dn))
                .map(str::to_string),
            host: host_record,
        })
    }

    /// Every environment with a production OU under the tenant root.
    pub async fn list_environments(&self) -> Result<Vec<EnvironmentSummary>> {
        let filter = Filter::and(vec![
            ObjectKind::OrganizationalUnit.filter(),
            Filter::starts_with("ou", PRODUCTION_OU_PREFIX),
        ]);
        let mut environments: Vec<EnvironmentSummary> = self
            .directory
            .search(
                &self.directory.config().tenant_root,
                Scope::OneLevel,
                &filter,
                &["ou", "description"],
            )
            .await?
            .filter_map(|entry| {
                let ou = entry.non_empty("ou").unwrap_or_else(|| dn::rdn_value(&entry.dn));
                let host = host_from_production_ou(&ou)?.to_string();
                Some(EnvironmentSummary {
                    host_identifier: host,
                    tenant_name: entry.non_empty("description"),
                })
            })
            .collect();

        environments.sort_by(|a, b| a.host_identifier.cmp(&b.host_identifier));
        debug!(count = environments.len(), "Listed environments");
        Ok(environments)
    }

    /// Computer objects under the infrastructure root with their probe records.
    pub async fn list_hosts(&self) -> Result<Vec<HostStatus>> {
        let names: Vec<String> = self
            .directory
            .search(
                &self.directory.config().infrastructure_root,
                Scope::Subtree,
                &ObjectKind::Computer.filter(),
                &["name"],
            )
            .await?
            .map(|entry| entry.non_empty("name").unwrap_or_else(|| dn::rdn_value(&entry.dn)))
            .collect();

        let mut probes = JoinSet::new();
        for name in names {
            let probe = self.probe.clone();
            probes.spawn(async move {
                let record = probe.record(&name).await;
                HostStatus { name, record }
            });
        }

        let mut hosts = Vec::new();
        while let Some(joined) = probes.join_next().await {
            if let Ok(status) = joined {
                hosts.push(status);
            }
        }

        hosts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hosts)
    }
}
