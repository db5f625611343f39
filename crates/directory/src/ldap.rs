//! Active Directory backend over LDAP using ldap3.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, SearchEntry};
use provisioner_core::{Error, ObjectRef, Result};
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::backend::DirectoryBackend;
use crate::config::DirectoryConfig;
use crate::dn::{escape_dn_value, leading_rdn};
use crate::model::{AttributeChange, Attributes, DirectoryEntry, Filter, ObjectKind, Scope, SearchResults};

/// LDAP result codes the client distinguishes.
mod rc {
    pub const SUCCESS: u32 = 0;
    pub const SIZE_LIMIT_EXCEEDED: u32 = 4;
    pub const ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
    pub const NO_SUCH_OBJECT: u32 = 32;
    pub const INVALID_CREDENTIALS: u32 = 49;
    pub const INSUFFICIENT_ACCESS: u32 = 50;
    pub const ENTRY_ALREADY_EXISTS: u32 = 68;
}

/// Encode a password for AD's `unicodePwd` attribute: quoted, then UTF-16LE.
pub fn encode_unicode_pwd(password: &str) -> Vec<u8> {
    format!("\"{password}\"")
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Map an LDAP result code to the provisioner's error taxonomy.
fn check_result(result: LdapResult, kind: ObjectRef, target: &str) -> Result<()> {
    match result.rc {
        rc::SUCCESS => Ok(()),
        rc::NO_SUCH_OBJECT => Err(Error::not_found(kind, target)),
        rc::ENTRY_ALREADY_EXISTS | rc::ATTRIBUTE_OR_VALUE_EXISTS => {
            Err(Error::already_exists(kind, target))
        }
        rc::INVALID_CREDENTIALS | rc::INSUFFICIENT_ACCESS => Err(Error::unauthorized(format!(
            "directory rejected operation on {} (code {}): {}",
            target, result.rc, result.text
        ))),
        code => Err(Error::unexpected(format!(
            "LDAP operation on {} failed with code {}: {}",
            target, code, result.text
        ))),
    }
}

/// Searches must be complete: a truncated result would hide existing entries.
fn check_search_result(result: LdapResult, base: &str) -> Result<()> {
    if result.rc == rc::SIZE_LIMIT_EXCEEDED {
        warn!(base, "Directory search truncated by size limit");
        return Err(Error::unexpected(format!(
            "search under {} exceeded the server size limit: {}",
            base, result.text
        )));
    }
    check_result(result, ObjectRef::Entry, base)
}

/// LDAP directory backend with a cached, bound connection.
pub struct LdapDirectory {
    config: DirectoryConfig,
    connection: RwLock<Option<Ldap>>,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        info!(
            url = %config.url,
            base_dn = %config.base_dn,
            "Created LDAP directory backend"
        );
        Self {
            config,
            connection: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Get a bound connection, creating one if necessary.
    async fn connection(&self) -> Result<Ldap> {
        {
            let guard = self.connection.read().await;
            if let Some(ref ldap) = *guard {
                return Ok(ldap.clone());
            }
        }

        let ldap = self.connect().await?;
        *self.connection.write().await = Some(ldap.clone());
        Ok(ldap)
    }

    async fn connect(&self) -> Result<Ldap> {
        debug!(url = %self.config.url, "Connecting to directory");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.op_timeout())
            .set_starttls(self.config.use_starttls)
            .set_no_tls_verify(self.config.tls_skip_verify);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| {
                Error::unexpected(format!(
                    "failed to connect to directory at {}: {}",
                    self.config.url, e
                ))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let password = self.config.bind_password.as_deref().unwrap_or("");
        let result = ldap
            .with_timeout(self.op_timeout())
            .simple_bind(&self.config.bind_dn, password)
            .await
            .map_err(|e| Error::unexpected(format!("LDAP bind failed: {}", e)))?;

        if result.rc == rc::INVALID_CREDENTIALS {
            return Err(Error::unauthorized(format!(
                "bind rejected for {}",
                self.config.bind_dn
            )));
        }
        check_result(result, ObjectRef::Entry, &self.config.bind_dn)?;

        info!(url = %self.config.url, "Directory connection established");
        Ok(ldap)
    }

    /// Transport failures invalidate the cached connection so the next call reconnects.
    async fn transport_error(&self, operation: &str, target: &str, err: LdapError) -> Error {
        metrics().directory_errors.inc();
        warn!(operation, target, error = %err, "LDAP transport error");
        *self.connection.write().await = None;
        Error::unexpected(format!("LDAP {} on {} failed: {}", operation, target, err))
    }

    fn record(&self, result: &Result<()>) {
        metrics().directory_operations.inc();
        if matches!(result, Err(e) if !e.is_already_exists() && !e.is_not_found()) {
            metrics().directory_errors.inc();
        }
    }
}

fn to_ldap_scope(scope: Scope) -> ldap3::Scope {
    match scope {
        Scope::Base => ldap3::Scope::Base,
        Scope::OneLevel => ldap3::Scope::OneLevel,
        Scope::Subtree => ldap3::Scope::Subtree,
    }
}

fn to_ldap_mod(change: AttributeChange) -> Mod<String> {
    match change {
        AttributeChange::Replace(name, values) => Mod::Replace(name, values.into_iter().collect()),
        AttributeChange::Add(name, values) => Mod::Add(name, values.into_iter().collect()),
        AttributeChange::Delete(name, values) => Mod::Delete(name, values.into_iter().collect()),
    }
}

#[async_trait]
impl DirectoryBackend for LdapDirectory {
    #[instrument(skip(self, attributes), fields(kind = ?kind))]
    async fn create_child(
        &self,
        kind: ObjectKind,
        name: &str,
        parent: &str,
        attributes: Attributes,
    ) -> Result<String> {
        let mut ldap = self.connection().await?;
        let dn = format!("{}={},{}", kind.rdn_type(), escape_dn_value(name), parent);

        let mut attrs: Vec<(String, HashSet<String>)> = vec![
            (
                "objectClass".to_string(),
                kind.object_classes().iter().map(|c| c.to_string()).collect(),
            ),
            (
                kind.rdn_type().to_lowercase(),
                HashSet::from([name.to_string()]),
            ),
        ];
        for (attr, values) in attributes {
            if !values.is_empty() {
                attrs.push((attr, values.into_iter().collect()));
            }
        }

        let result = match ldap.with_timeout(self.op_timeout()).add(&dn, attrs).await {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("add", &dn, e).await),
        };

        let outcome = match result.rc {
            rc::NO_SUCH_OBJECT => Err(Error::not_found(ObjectRef::Entry, parent)),
            _ => check_result(result, kind.object_ref(), &dn),
        };
        self.record(&outcome);
        outcome?;

        debug!(dn = %dn, "Directory entry created");
        Ok(dn)
    }

    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<SearchResults> {
        let mut ldap = self.connection().await?;
        let filter = filter.to_ldap();

        debug!(base, filter = %filter, page_size = self.config.page_size, "Directory search");

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.config.page_size.max(1))),
        ];
        let mut stream = match ldap
            .with_timeout(self.op_timeout())
            .streaming_search_with(
                adapters,
                base,
                to_ldap_scope(scope),
                &filter,
                attributes.to_vec(),
            )
            .await
        {
            Ok(stream) => stream,
            Err(e) => return Err(self.transport_error("search", base, e).await),
        };

        let mut entries = Vec::new();
        loop {
            match stream.next().await {
                Ok(Some(entry)) => {
                    let entry = SearchEntry::construct(entry);
                    entries.push(DirectoryEntry::from_attributes(entry.dn, entry.attrs));
                }
                Ok(None) => break,
                Err(e) => return Err(self.transport_error("search", base, e).await),
            }
        }

        let outcome = check_search_result(stream.finish().await, base);
        self.record(&outcome);
        outcome?;

        Ok(SearchResults::new(entries))
    }

    async fn modify(&self, dn: &str, changes: Vec<AttributeChange>) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut ldap = self.connection().await?;
        let mods: Vec<Mod<String>> = changes.into_iter().map(to_ldap_mod).collect();

        let result = match ldap.with_timeout(self.op_timeout()).modify(dn, mods).await {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("modify", dn, e).await),
        };

        let outcome = check_result(result, ObjectRef::Entry, dn);
        self.record(&outcome);
        outcome
    }

    async fn move_entry(&self, dn: &str, new_parent: &str) -> Result<String> {
        let mut ldap = self.connection().await?;
        let rdn = leading_rdn(dn).to_string();

        let result = match ldap
            .with_timeout(self.op_timeout())
            .modifydn(dn, &rdn, true, Some(new_parent))
            .await
        {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("modifydn", dn, e).await),
        };

        let outcome = check_result(result, ObjectRef::Entry, dn);
        self.record(&outcome);
        outcome?;

        Ok(format!("{rdn},{new_parent}"))
    }

    #[instrument(skip(self, password))]
    async fn set_password(&self, dn: &str, password: &str) -> Result<()> {
        if !self.config.is_secure() {
            return Err(Error::unexpected(
                "password writes require an ldaps:// URL or StartTLS",
            ));
        }

        let mut ldap = self.connection().await?;
        let mods = vec![Mod::Replace(
            b"unicodePwd".to_vec(),
            HashSet::from([encode_unicode_pwd(password)]),
        )];

        let result = match ldap.with_timeout(self.op_timeout()).modify(dn, mods).await {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("set password", dn, e).await),
        };

        let outcome = check_result(result, ObjectRef::User, dn);
        self.record(&outcome);
        outcome
    }

    async fn check_connection(&self) -> Result<()> {
        let filter = Filter::present("objectClass");
        self.search(&self.config.base_dn, Scope::Base, &filter, &["distinguishedName"])
            .await
            .map(|_| ())
    }
}
