//! Object kinds, search filters and entries shared by every backend.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use provisioner_core::ObjectRef;
use serde::{Deserialize, Serialize};

use crate::dn::escape_filter_value;

/// Directory object kinds the provisioner manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    OrganizationalUnit,
    Group,
    User,
    Computer,
}

impl ObjectKind {
    /// RDN attribute type used when naming a new child.
    pub fn rdn_type(&self) -> &'static str {
        match self {
            Self::OrganizationalUnit => "OU",
            Self::Group | Self::User | Self::Computer => "CN",
        }
    }

    /// Full objectClass chain written on creation.
    pub fn object_classes(&self) -> &'static [&'static str] {
        match self {
            Self::OrganizationalUnit => &["top", "organizationalUnit"],
            Self::Group => &["top", "group"],
            Self::User => &["top", "person", "organizationalPerson", "user"],
            Self::Computer => &["top", "person", "organizationalPerson", "user", "computer"],
        }
    }

    /// Short objectCategory value (AD expands it to the schema DN).
    pub fn category(&self) -> &'static str {
        match self {
            Self::OrganizationalUnit => "organizationalUnit",
            Self::Group => "group",
            Self::User => "person",
            Self::Computer => "computer",
        }
    }

    /// Attribute holding the name callers look objects up by.
    pub fn lookup_attribute(&self) -> &'static str {
        match self {
            Self::OrganizationalUnit => "ou",
            Self::Group | Self::User => "sAMAccountName",
            Self::Computer => "name",
        }
    }

    /// Filter matching every object of this kind.
    pub fn filter(&self) -> Filter {
        match self {
            Self::User => Filter::and(vec![
                Filter::eq("objectCategory", self.category()),
                Filter::eq("objectClass", "user"),
            ]),
            _ => Filter::eq("objectCategory", self.category()),
        }
    }

    /// Filter matching the object of this kind with the given name.
    pub fn named(&self, name: &str) -> Filter {
        Filter::and(vec![self.filter(), Filter::eq(self.lookup_attribute(), name)])
    }

    pub fn object_ref(&self) -> ObjectRef {
        match self {
            Self::OrganizationalUnit => ObjectRef::OrganizationalUnit,
            Self::Group => ObjectRef::Group,
            Self::User => ObjectRef::User,
            Self::Computer => ObjectRef::Computer,
        }
    }
}

/// Search scope relative to the base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
}

/// Structured search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Equals { attribute: String, value: String },
    StartsWith { attribute: String, prefix: String },
    Present(String),
}

impl Filter {
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn starts_with(attribute: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::StartsWith {
            attribute: attribute.into(),
            prefix: prefix.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present(attribute.into())
    }

    /// Render as an RFC 4515 filter string with escaped values.
    pub fn to_ldap(&self) -> String {
        match self {
            Self::And(filters) => {
                let inner: String = filters.iter().map(Self::to_ldap).collect();
                format!("(&{inner})")
            }
            Self::Or(filters) => {
                let inner: String = filters.iter().map(Self::to_ldap).collect();
                format!("(|{inner})")
            }
            Self::Equals { attribute, value } => {
                format!("({}={})", attribute, escape_filter_value(value))
            }
            Self::StartsWith { attribute, prefix } => {
                format!("({}={}*)", attribute, escape_filter_value(prefix))
            }
            Self::Present(attribute) => format!("({attribute}=*)"),
        }
    }

    /// Evaluate against an entry; comparison is case-insensitive like AD.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Self::Equals { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            Self::StartsWith { attribute, prefix } => {
                let prefix = prefix.to_lowercase();
                entry
                    .values(attribute)
                    .iter()
                    .any(|v| v.to_lowercase().starts_with(&prefix))
            }
            Self::Present(attribute) => !entry.values(attribute).is_empty(),
        }
    }
}

/// Attributes written when creating an object.
pub type Attributes = Vec<(String, Vec<String>)>;

/// A single modification of an entry's attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    Replace(String, Vec<String>),
    Add(String, Vec<String>),
    /// Remove the listed values, or the whole attribute when empty.
    Delete(String, Vec<String>),
}

/// A directory entry with attribute names folded to lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn from_attributes<I>(dn: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut entry = Self::new(dn);
        for (name, values) in attributes {
            entry.attributes.insert(name.to_lowercase(), values);
        }
        entry
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// First value, treating empty strings as absent.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.first(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn set(&mut self, name: &str, values: Vec<String>) {
        if values.is_empty() {
            self.attributes.remove(&name.to_lowercase());
        } else {
            self.attributes.insert(name.to_lowercase(), values);
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.attributes.iter()
    }

    /// Integer attribute such as `userAccountControl`.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.first(name).and_then(|v| v.trim().parse().ok())
    }

    /// Generalized-time attribute such as `whenCreated` (`20250407050719.0Z`).
    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        self.first(name).and_then(parse_generalized_time)
    }
}

/// Parse an LDAP generalized time value.
pub fn parse_generalized_time(value: &str) -> Option<DateTime<Utc>> {
    let digits = value.get(..14)?;
    NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as LDAP generalized time.
pub fn format_generalized_time(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%S.0Z").to_string()
}

/// Search results: a finite sequence that can be consumed once.
#[derive(Debug)]
pub struct SearchResults {
    entries: std::vec::IntoIter<DirectoryEntry>,
}

impl SearchResults {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for SearchResults {
    type Item = DirectoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for SearchResults {}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_entry() -> DirectoryEntry {
        DirectoryEntry::from_attributes(
            "CN=srv1,OU=PROD_SRV01,DC=labs,DC=local",
            vec![
                ("objectCategory".to_string(), vec!["person".to_string()]),
                (
                    "objectClass".to_string(),
                    vec!["top".to_string(), "user".to_string()],
                ),
                ("sAMAccountName".to_string(), vec!["srv1".to_string()]),
                ("whenCreated".to_string(), vec!["20250407050719.0Z".to_string()]),
                ("userAccountControl".to_string(), vec!["66048".to_string()]),
            ],
        )
    }

    #[test]
    fn test_filter_rendering() {
        assert_eq!(
            ObjectKind::User.named("srv1").to_ldap(),
            "(&(&(objectCategory=person)(objectClass=user))(sAMAccountName=srv1))"
        );
        assert_eq!(
            ObjectKind::OrganizationalUnit.named("PROD_SRV01").to_ldap(),
            "(&(objectCategory=organizationalUnit)(ou=PROD_SRV01))"
        );
        assert_eq!(
            Filter::starts_with("sAMAccountName", "sr*").to_ldap(),
            "(sAMAccountName=sr\\2a*)"
        );
    }

    #[test]
    fn test_filter_matching_is_case_insensitive() {
        let entry = user_entry();
        assert!(ObjectKind::User.named("SRV1").matches(&entry));
        assert!(Filter::starts_with("samaccountname", "SR").matches(&entry));
        assert!(!ObjectKind::Computer.filter().matches(&entry));
        assert!(Filter::or(vec![Filter::present("mail"), Filter::present("whenCreated")])
            .matches(&entry));
    }

    #[test]
    fn test_entry_accessors() {
        let entry = user_entry();
        assert_eq!(entry.int("userAccountControl"), Some(66048));
        let created = entry.timestamp("whenCreated").unwrap();
        assert_eq!(format_generalized_time(created), "20250407050719.0Z");
        assert_eq!(entry.first("missing"), None);
    }

    #[test]
    fn test_search_results_consumed_once() {
        let mut results = SearchResults::new(vec![user_entry()]);
        assert_eq!(results.len(), 1);
        assert!(results.next().is_some());
        assert!(results.next().is_none());
    }
}
