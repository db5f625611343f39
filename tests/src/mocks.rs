//! Mock implementations for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directory_client::{
    AttributeChange, Attributes, DirectoryBackend, Filter, MemoryDirectory, ObjectKind, Scope,
    SearchResults,
};
use host_inventory::RemoteQuery;
use parking_lot::Mutex;
use provisioner_core::{Error, Result};

/// Mock inventory agent with scripted answers.
#[derive(Clone, Default)]
pub struct MockRemoteQuery {
    remote_id: Arc<Mutex<Option<String>>>,
    last_boot: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Simulate failures if set.
    should_fail: Arc<Mutex<bool>>,
    calls: Arc<Mutex<usize>>,
}

impl MockRemoteQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_remote_id(&self, id: impl Into<String>) {
        *self.remote_id.lock() = Some(id.into());
    }

    pub fn set_last_boot(&self, time: DateTime<Utc>) {
        *self.last_boot.lock() = Some(time);
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    fn answer<T: Clone>(&self, host: &str, value: &Mutex<Option<T>>) -> Result<Option<T>> {
        *self.calls.lock() += 1;
        if *self.should_fail.lock() {
            return Err(Error::unreachable(host));
        }
        Ok(value.lock().clone())
    }
}

#[async_trait]
impl RemoteQuery for MockRemoteQuery {
    async fn last_boot_time(&self, host: &str) -> Result<Option<DateTime<Utc>>> {
        self.answer(host, &self.last_boot)
    }

    async fn remote_access_id(&self, host: &str) -> Result<Option<String>> {
        self.answer(host, &self.remote_id)
    }
}

/// Directory backend that adds latency in front of a [`MemoryDirectory`].
///
/// The delay yields to the scheduler on every call, so concurrent workflows
/// interleave the way they would against a real server.
pub struct SlowDirectory {
    inner: Arc<MemoryDirectory>,
    delay: Duration,
}

impl SlowDirectory {
    pub fn new(inner: Arc<MemoryDirectory>, delay: Duration) -> Self {
        Self { inner, delay }
    }

    async fn pause(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

#[async_trait]
impl DirectoryBackend for SlowDirectory {
    async fn create_child(
        &self,
        kind: ObjectKind,
        name: &str,
        parent: &str,
        attributes: Attributes,
    ) -> Result<String> {
        self.pause().await;
        self.inner.create_child(kind, name, parent, attributes).await
    }

    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
    ) -> Result<SearchResults> {
        self.pause().await;
        self.inner.search(base, scope, filter, attributes).await
    }

    async fn modify(&self, dn: &str, changes: Vec<AttributeChange>) -> Result<()> {
        self.pause().await;
        self.inner.modify(dn, changes).await
    }

    async fn move_entry(&self, dn: &str, new_parent: &str) -> Result<String> {
        self.pause().await;
        self.inner.move_entry(dn, new_parent).await
    }

    async fn set_password(&self, dn: &str, password: &str) -> Result<()> {
        self.pause().await;
        self.inner.set_password(dn, password).await
    }

    async fn check_connection(&self) -> Result<()> {
        self.inner.check_connection().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_remote_query_answers() {
        let mock = MockRemoteQuery::new();
        assert_eq!(mock.remote_access_id("SRV01").await.unwrap(), None);

        mock.set_remote_id("123 456 789");
        assert_eq!(
            mock.remote_access_id("SRV01").await.unwrap().as_deref(),
            Some("123 456 789")
        );

        mock.set_should_fail(true);
        assert_eq!(
            mock.last_boot_time("SRV01").await.unwrap_err().code(),
            "HOST_001"
        );
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_slow_directory_delegates() {
        let memory = Arc::new(MemoryDirectory::new());
        memory.add_container("OU=Clinic,DC=labs,DC=local");
        let slow = SlowDirectory::new(memory.clone(), Duration::from_millis(5));

        slow.create_child(
            ObjectKind::OrganizationalUnit,
            "PROD_SRV01",
            "OU=Clinic,DC=labs,DC=local",
            Vec::new(),
        )
        .await
        .unwrap();
        assert_eq!(memory.created_count(), 1);
    }
}
