//! Next free account index for an environment.

use directory_client::{DirectoryClient, Filter, ObjectKind, Scope};
use provisioner_core::{Error, Result};
use regex::Regex;
use tracing::debug;

/// Highest `{prefix}{n}` index among `names`, plus one. Non-matching names are ignored.
pub fn next_index_from<'a, I>(names: I, prefix: &str) -> Result<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let pattern = Regex::new(&format!(r"(?i)^{}(\d+)$", regex::escape(prefix)))
        .map_err(|e| Error::unexpected(format!("invalid username pattern: {}", e)))?;

    let highest = names
        .into_iter()
        .filter_map(|name| pattern.captures(name))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    highest
        .checked_add(1)
        .ok_or_else(|| Error::validation(format!("account index space exhausted for {prefix}")))
}

/// Finds the next index by scanning the production OU; gaps are never refilled.
#[derive(Clone)]
pub struct UserIndexAllocator {
    directory: DirectoryClient,
}

impl UserIndexAllocator {
    pub fn new(directory: DirectoryClient) -> Self {
        Self { directory }
    }

    pub async fn next_index(&self, ou_path: &str, prefix: &str) -> Result<u32> {
        let filter = Filter::and(vec![
            ObjectKind::User.filter(),
            Filter::starts_with("sAMAccountName", prefix),
        ]);
        let accounts: Vec<String> = self
            .directory
            .search(ou_path, Scope::OneLevel, &filter, &["sAMAccountName"])
            .await?
            .filter_map(|entry| entry.first("sAMAccountName").map(str::to_string))
            .collect();

        let next = next_index_from(accounts.iter().map(String::as_str), prefix)?;
        debug!(ou_path, prefix, existing = accounts.len(), next, "Allocated account index");
        Ok(next)
    }
}
