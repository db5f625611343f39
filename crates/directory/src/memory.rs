//! In-memory directory backend.
//!
//! Mirrors the AD behaviours the provisioner relies on: case-insensitive
//! names, domain-wide `sAMAccountName` uniqueness, subtree moves and the
//! `member`/`memberOf` link pair. Used for dry runs and tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use provisioner_core::{Error, ObjectRef, Result};

use crate::backend::DirectoryBackend;
use crate::config::DirectoryConfig;
use crate::dn::{dn_eq, escape_dn_value, is_descendant, leading_rdn, normalize_dn, parent_dn};
use crate::model::{
    format_generalized_time, AttributeChange, Attributes, DirectoryEntry, Filter, ObjectKind,
    Scope, SearchResults,
};

/// Default `userAccountControl` AD assigns a new user: normal account, disabled.
const NEW_USER_ACCOUNT_CONTROL: &str = "514";
/// Default `userAccountControl` for a workstation trust account.
const NEW_COMPUTER_ACCOUNT_CONTROL: &str = "4096";
/// Global security group.
const DEFAULT_GROUP_TYPE: &str = "-2147483646";

#[derive(Default)]
struct State {
    /// Entries keyed by normalized DN.
    entries: BTreeMap<String, DirectoryEntry>,
    /// Passwords keyed by normalized DN.
    passwords: HashMap<String, String>,
    failing_names: HashSet<String>,
    deny_all: bool,
    unavailable: bool,
    size_limit: Option<usize>,
    created: u64,
}

impl State {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::unexpected("directory server unavailable"));
        }
        if self.deny_all {
            return Err(Error::unauthorized("service account lacks rights"));
        }
        Ok(())
    }

    fn get(&self, dn: &str) -> Option<&DirectoryEntry> {
        self.entries.get(&normalize_dn(dn))
    }

    fn get_mut(&mut self, dn: &str) -> Option<&mut DirectoryEntry> {
        self.entries.get_mut(&normalize_dn(dn))
    }

    fn insert(&mut self, entry: DirectoryEntry) {
        self.entries.insert(normalize_dn(&entry.dn), entry);
    }

    fn account_name_taken(&self, name: &str) -> bool {
        self.entries.values().any(|e| {
            e.values("sAMAccountName")
                .iter()
                .any(|v| v.eq_ignore_ascii_case(name))
        })
    }

    /// Add or remove `dn` from the `memberOf` list of `member`.
    fn link_member(&mut self, member: &str, group: &str, present: bool) {
        let Some(entry) = self.get_mut(member) else {
            return;
        };
        let mut values: Vec<String> = entry
            .values("memberOf")
            .iter()
            .filter(|v| !dn_eq(v, group))
            .cloned()
            .collect();
        if present {
            values.push(group.to_string());
        }
        entry.set("memberOf", values);
    }
}

/// Rewrite `dn`, which lies at or below `old_base`, to sit below `new_base`.
fn rebase(dn: &str, old_base: &str, new_base: &str) -> String {
    let mut rdns = Vec::new();
    let mut rest = dn;
    while !dn_eq(rest, old_base) {
        rdns.push(leading_rdn(rest));
        match parent_dn(rest) {
            Some(parent) => rest = parent,
            None => return dn.to_string(),
        }
    }
    if rdns.is_empty() {
        return new_base.to_string();
    }
    format!("{},{}", rdns.join(","), new_base)
}

/// Directory backend kept entirely in memory.
#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<State>,
}

impl MemoryDirectory {
    /// Empty directory with no containers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-populated with the containers named in `config`.
    pub fn with_layout(config: &DirectoryConfig) -> Self {
        let directory = Self::new();
        directory.add_container(&config.base_dn);
        directory.add_container(&config.tenant_root);
        directory.add_container(&config.infrastructure_root);
        directory.add_container(&config.groups_container);
        directory
    }

    /// Insert a container entry (and any missing ancestors) directly.
    pub fn add_container(&self, dn: &str) {
        let mut state = self.state.lock();
        let mut pending = Vec::new();
        let mut current = Some(dn);
        while let Some(dn) = current {
            if state.get(dn).is_some() {
                break;
            }
            pending.push(dn.to_string());
            current = parent_dn(dn);
        }

        for dn in pending.into_iter().rev() {
            let rdn = leading_rdn(&dn).to_string();
            let (rdn_type, value) = rdn.split_once('=').unwrap_or(("OU", rdn.as_str()));
            let (classes, category) = match rdn_type.to_ascii_uppercase().as_str() {
                "DC" => (vec!["top", "domain", "domainDNS"], "domainDNS"),
                "CN" => (vec!["top", "container"], "container"),
                _ => (vec!["top", "organizationalUnit"], "organizationalUnit"),
            };
            let entry = DirectoryEntry::from_attributes(
                dn.clone(),
                vec![
                    (
                        "objectClass".to_string(),
                        classes.into_iter().map(str::to_string).collect(),
                    ),
                    ("objectCategory".to_string(), vec![category.to_string()]),
                    (rdn_type.to_lowercase(), vec![value.to_string()]),
                    ("name".to_string(), vec![value.to_string()]),
                    ("distinguishedName".to_string(), vec![dn.clone()]),
                ],
            );
            state.insert(entry);
        }
    }

    /// Insert a computer account below `parent`, returning its DN.
    pub fn add_computer(&self, name: &str, parent: &str) -> String {
        self.add_container(parent);
        let dn = format!("CN={},{}", escape_dn_value(name), parent);
        let entry = DirectoryEntry::from_attributes(
            dn.clone(),
            vec![
                (
                    "objectClass".to_string(),
                    ObjectKind::Computer
                        .object_classes()
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                ),
                ("objectCategory".to_string(), vec!["computer".to_string()]),
                ("cn".to_string(), vec![name.to_string()]),
                ("name".to_string(), vec![name.to_string()]),
                ("sAMAccountName".to_string(), vec![format!("{name}$")]),
                ("distinguishedName".to_string(), vec![dn.clone()]),
                (
                    "userAccountControl".to_string(),
                    vec![NEW_COMPUTER_ACCOUNT_CONTROL.to_string()],
                ),
            ],
        );
        self.state.lock().insert(entry);
        dn
    }

    /// Insert an enabled user account below `parent`, returning its DN.
    pub fn add_user(&self, username: &str, parent: &str) -> String {
        self.add_container(parent);
        let dn = format!("CN={},{}", escape_dn_value(username), parent);
        let entry = DirectoryEntry::from_attributes(
            dn.clone(),
            vec![
                (
                    "objectClass".to_string(),
                    ObjectKind::User
                        .object_classes()
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                ),
                ("objectCategory".to_string(), vec!["person".to_string()]),
                ("cn".to_string(), vec![username.to_string()]),
                ("name".to_string(), vec![username.to_string()]),
                ("sAMAccountName".to_string(), vec![username.to_string()]),
                ("distinguishedName".to_string(), vec![dn.clone()]),
                ("userAccountControl".to_string(), vec!["66048".to_string()]),
            ],
        );
        self.state.lock().insert(entry);
        dn
    }

    /// Snapshot of the entry at `dn`.
    pub fn entry(&self, dn: &str) -> Option<DirectoryEntry> {
        self.state.lock().get(dn).cloned()
    }

    pub fn password_of(&self, dn: &str) -> Option<String> {
        self.state.lock().passwords.get(&normalize_dn(dn)).cloned()
    }

    /// Make every create of an object with this name fail.
    pub fn fail_creates_for(&self, name: &str) {
        self.state.lock().failing_names.insert(name.to_lowercase());
    }

    /// Reject every operation as if the service account had no rights.
    pub fn set_deny_all(&self, deny: bool) {
        self.state.lock().deny_all = deny;
    }

    /// Fail every operation as if the server were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Fail searches that match more than `limit` entries, like a server size limit.
    pub fn set_size_limit(&self, limit: Option<usize>) {
        self.state.lock().size_limit = limit;
    }

    /// Number of objects created through [`DirectoryBackend::create_child`].
    pub fn created_count(&self) -> u64 {
        self.state.lock().created
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DirectoryBackend for MemoryDirectory {
    async fn create_child(
        &self,
        kind: ObjectKind,
        name: &str,
        parent: &str,
        attributes: Attributes,
    ) -> Result<String> {
        let mut state = self.state.lock();
        state.check_available()?;

        if state.failing_names.contains(&name.to_lowercase()) {
            return Err(Error::unexpected(format!(
                "server refused to create {name}"
            )));
        }
        if state.get(parent).is_none() {
            return Err(Error::not_found(ObjectRef::Entry, parent));
        }

        let dn = format!("{}={},{}", kind.rdn_type(), escape_dn_value(name), parent);
        if state.get(&dn).is_some() {
            return Err(Error::already_exists(kind.object_ref(), name));
        }

        let mut entry = DirectoryEntry::from_attributes(
            dn.clone(),
            vec![
                (
                    "objectClass".to_string(),
                    kind.object_classes().iter().map(|c| c.to_string()).collect(),
                ),
                ("objectCategory".to_string(), vec![kind.category().to_string()]),
                (kind.rdn_type().to_lowercase(), vec![name.to_string()]),
                ("name".to_string(), vec![name.to_string()]),
                ("distinguishedName".to_string(), vec![dn.clone()]),
                (
                    "whenCreated".to_string(),
                    vec![format_generalized_time(Utc::now())],
                ),
            ],
        );
        match kind {
            ObjectKind::User => {
                entry.set(
                    "userAccountControl",
                    vec![NEW_USER_ACCOUNT_CONTROL.to_string()],
                );
            }
            ObjectKind::Computer => {
                entry.set(
                    "userAccountControl",
                    vec![NEW_COMPUTER_ACCOUNT_CONTROL.to_string()],
                );
            }
            ObjectKind::Group => entry.set("groupType", vec![DEFAULT_GROUP_TYPE.to_string()]),
            ObjectKind::OrganizationalUnit => {}
        }
        for (attr, values) in attributes {
            entry.set(&attr, values);
        }

        if let Some(account) = entry.first("sAMAccountName").map(str::to_string) {
            if state.account_name_taken(&account) {
                return Err(Error::already_exists(kind.object_ref(), account));
            }
        }

        state.insert(entry);
        state.created += 1;
        Ok(dn)
    }

    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<SearchResults> {
        let state = self.state.lock();
        state.check_available()?;

        if state.get(base).is_none() {
            return Err(Error::not_found(ObjectRef::Entry, base));
        }

        let entries = state
            .entries
            .values()
            .filter(|entry| match scope {
                Scope::Base => dn_eq(&entry.dn, base),
                Scope::OneLevel => parent_dn(&entry.dn).is_some_and(|p| dn_eq(p, base)),
                Scope::Subtree => dn_eq(&entry.dn, base) || is_descendant(&entry.dn, base),
            })
            .filter(|entry| filter.matches(entry))
            .map(|entry| {
                if attributes.is_empty() {
                    return entry.clone();
                }
                let selected = attributes
                    .iter()
                    .map(|name| (name.to_string(), entry.values(name).to_vec()))
                    .filter(|(_, values)| !values.is_empty());
                DirectoryEntry::from_attributes(entry.dn.clone(), selected)
            })
            .collect::<Vec<_>>();

        if let Some(limit) = state.size_limit.filter(|limit| entries.len() > *limit) {
            return Err(Error::unexpected(format!(
                "search under {} exceeded the server size limit of {}",
                base, limit
            )));
        }

        Ok(SearchResults::new(entries))
    }

    async fn modify(&self, dn: &str, changes: Vec<AttributeChange>) -> Result<()> {
        let mut state = self.state.lock();
        state.check_available()?;

        let Some(current) = state.get(dn).cloned() else {
            return Err(Error::not_found(ObjectRef::Entry, dn));
        };
        let mut updated = current.clone();
        let mut links = Vec::new();

        for change in changes {
            match change {
                AttributeChange::Replace(attr, values) => {
                    if attr.eq_ignore_ascii_case("member") {
                        for old in updated.values("member") {
                            links.push((old.clone(), false));
                        }
                        links.extend(values.iter().map(|v| (v.clone(), true)));
                    }
                    updated.set(&attr, values);
                }
                AttributeChange::Add(attr, values) => {
                    let mut merged = updated.values(&attr).to_vec();
                    for value in values {
                        if merged.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
                            return Err(Error::already_exists(ObjectRef::Entry, value));
                        }
                        if attr.eq_ignore_ascii_case("member") {
                            if state.get(&value).is_none() {
                                return Err(Error::not_found(ObjectRef::Entry, value));
                            }
                            links.push((value.clone(), true));
                        }
                        merged.push(value);
                    }
                    updated.set(&attr, merged);
                }
                AttributeChange::Delete(attr, values) => {
                    let remaining = if values.is_empty() {
                        Vec::new()
                    } else {
                        updated
                            .values(&attr)
                            .iter()
                            .filter(|v| !values.iter().any(|d| d.eq_ignore_ascii_case(v)))
                            .cloned()
                            .collect()
                    };
                    if attr.eq_ignore_ascii_case("member") {
                        for old in updated.values("member") {
                            if !remaining.contains(old) {
                                links.push((old.clone(), false));
                            }
                        }
                    }
                    updated.set(&attr, remaining);
                }
            }
        }

        state.insert(updated);
        for (member, present) in links {
            state.link_member(&member, &current.dn, present);
        }
        Ok(())
    }

    async fn move_entry(&self, dn: &str, new_parent: &str) -> Result<String> {
        let mut state = self.state.lock();
        state.check_available()?;

        let Some(entry) = state.get(dn) else {
            return Err(Error::not_found(ObjectRef::Entry, dn));
        };
        let old_dn = entry.dn.clone();
        if state.get(new_parent).is_none() {
            return Err(Error::not_found(ObjectRef::Entry, new_parent));
        }

        let new_dn = format!("{},{}", leading_rdn(&old_dn), new_parent);
        if dn_eq(&new_dn, &old_dn) {
            return Ok(old_dn);
        }
        if state.get(&new_dn).is_some() {
            return Err(Error::already_exists(ObjectRef::Entry, new_dn));
        }

        let moved: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| dn_eq(&e.dn, &old_dn) || is_descendant(&e.dn, &old_dn))
            .map(|(key, _)| key.clone())
            .collect();

        for key in moved {
            if let Some(mut entry) = state.entries.remove(&key) {
                let rebased = rebase(&entry.dn, &old_dn, &new_dn);
                if let Some(password) = state.passwords.remove(&key) {
                    state.passwords.insert(normalize_dn(&rebased), password);
                }
                entry.dn = rebased.clone();
                entry.set("distinguishedName", vec![rebased]);
                state.insert(entry);
            }
        }

        for entry in state.entries.values_mut() {
            for attr in ["member", "memberOf"] {
                let values = entry.values(attr);
                if values
                    .iter()
                    .any(|v| dn_eq(v, &old_dn) || is_descendant(v, &old_dn))
                {
                    let rewritten = values
                        .iter()
                        .map(|v| {
                            if dn_eq(v, &old_dn) || is_descendant(v, &old_dn) {
                                rebase(v, &old_dn, &new_dn)
                            } else {
                                v.clone()
                            }
                        })
                        .collect();
                    entry.set(attr, rewritten);
                }
            }
        }

        Ok(new_dn)
    }

    async fn set_password(&self, dn: &str, password: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.check_available()?;

        let Some(entry) = state.get_mut(dn) else {
            return Err(Error::not_found(ObjectRef::User, dn));
        };
        entry.set("pwdLastSet", vec![format_generalized_time(Utc::now())]);
        state.passwords.insert(normalize_dn(dn), password.to_string());
        Ok(())
    }

    async fn check_connection(&self) -> Result<()> {
        self.state.lock().check_available()
    }
}
