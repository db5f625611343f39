//! End-to-end tests for environment queries and account lifecycle.

use chrono::{DateTime, Utc};
use directory_client::{AttributeChange, DirectoryBackend};
use integration_tests::fixtures::{environment_request, environment_request_for, CLOUD_OU, HOST, REQUESTED_BY, TENANT};
use integration_tests::setup::TestContext;

/// Describe reports audit fields, account count and host placement
#[tokio::test]
async fn test_describe_environment() {
    let ctx = TestContext::new();
    let boot: DateTime<Utc> = "2026-10-01T06:30:00Z".parse().unwrap();
    ctx.remote.set_last_boot(boot);
    ctx.remote.set_remote_id("482 913 557");
    ctx.engine
        .create_environment(&environment_request(3))
        .await
        .unwrap();

    let info = ctx.engine.describe_environment("srv01").await.unwrap();
    assert_eq!(info.host_identifier, HOST);
    assert_eq!(info.tenant_name.as_deref(), Some(TENANT));
    assert_eq!(info.created_by.as_deref(), Some(REQUESTED_BY));
    assert_eq!(info.user_count, 3);
    assert_eq!(info.computer_container.as_deref(), Some(CLOUD_OU));
    let host = info.host.as_ref().unwrap();
    assert!(!host.reachable);
    assert_eq!(host.last_reboot_time, Some(boot));
    assert_eq!(host.remote_access_id.as_deref(), Some("482 913 557"));

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["userCount"], 3);
    assert_eq!(json["tenantName"], TENANT);
    assert_eq!(json["host"]["remoteAccessId"], "482 913 557");
    assert_eq!(json["host"]["reachable"], false);
}

/// Host probe results are cached across queries
#[tokio::test]
async fn test_host_records_are_cached() {
    let ctx = TestContext::new();
    ctx.remote.set_remote_id("482 913 557");

    let first = ctx.engine.describe_environment(HOST).await.unwrap();
    let calls = ctx.remote.call_count();
    assert_eq!(calls, 2);

    let second = ctx.engine.describe_environment("srv01").await.unwrap();
    let hosts = ctx.engine.list_hosts().await.unwrap();
    assert_eq!(ctx.remote.call_count(), calls);
    assert_eq!(first.host, second.host);
    assert!(hosts.is_empty());
}

/// A host that is not yet provisioned is still described
#[tokio::test]
async fn test_describe_unprovisioned_host() {
    let ctx = TestContext::new();

    let info = ctx.engine.describe_environment(HOST).await.unwrap();
    assert_eq!(info.tenant_name, None);
    assert_eq!(info.user_count, 0);
    assert!(info.host.is_some());
    assert_eq!(
        info.computer_container.as_deref(),
        Some("CN=Computers,DC=labs,DC=local")
    );
}

/// Unknown hosts are NotFound
#[tokio::test]
async fn test_describe_unknown_host() {
    let ctx = TestContext::new();
    let err = ctx.engine.describe_environment("SRV99").await.unwrap_err();
    assert_eq!(ctx.remote.call_count(), 0);
    assert!(err.is_not_found());
}

/// Environments are listed sorted by host
#[tokio::test]
async fn test_list_environments() {
    let ctx = TestContext::new();
    ctx.add_host("APP07");
    ctx.engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();
    ctx.engine
        .create_environment(&environment_request_for("APP07", 1))
        .await
        .unwrap();

    let environments = ctx.engine.list_environments().await.unwrap();
    let hosts: Vec<&str> = environments
        .iter()
        .map(|e| e.host_identifier.as_str())
        .collect();
    assert_eq!(hosts, vec!["APP07", "SRV01"]);
    assert_eq!(environments[0].tenant_name.as_deref(), Some("Tenant APP07"));
    assert_eq!(environments[1].tenant_name.as_deref(), Some(TENANT));
}

/// Moved hosts are listed with their probe records
#[tokio::test]
async fn test_list_hosts() {
    let ctx = TestContext::new();
    ctx.remote.set_remote_id("482 913 557");
    ctx.engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();

    let hosts = ctx.engine.list_hosts().await.unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].name, HOST);
    assert!(!hosts[0].record.reachable);
    assert_eq!(hosts[0].record.remote_access_id.as_deref(), Some("482 913 557"));

    let json = serde_json::to_value(&hosts).unwrap();
    assert_eq!(json[0]["name"], HOST);
    assert_eq!(json[0]["remoteAccessId"], "482 913 557");
}

/// Disable, enable, unlock and reset on a provisioned account
#[tokio::test]
async fn test_account_lifecycle() {
    let ctx = TestContext::new();
    ctx.engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();

    let info = ctx.engine.account_info("srv1").await.unwrap();
    assert!(!info.disabled);
    assert!(!info.locked);
    assert_eq!(info.display_name.as_deref(), Some("SRV1"));

    ctx.engine.disable_user("srv1").await.unwrap();
    assert!(ctx.engine.account_info("srv1").await.unwrap().disabled);
    ctx.engine.enable_user("srv1").await.unwrap();
    assert!(!ctx.engine.account_info("srv1").await.unwrap().disabled);

    assert!(!ctx.engine.unlock_user("srv1").await.unwrap());
    let user = ctx.directory.find_user("srv1").await.unwrap();
    ctx.directory
        .backend()
        .modify(
            &user.dn,
            vec![AttributeChange::Replace(
                "lockoutTime".to_string(),
                vec!["133000000000000000".to_string()],
            )],
        )
        .await
        .unwrap();
    assert!(ctx.engine.account_info("srv1").await.unwrap().locked);
    assert!(ctx.engine.unlock_user("srv1").await.unwrap());
    assert!(!ctx.engine.account_info("srv1").await.unwrap().locked);

    let credential = ctx.engine.reset_password("srv1", None).await.unwrap();
    assert_eq!(ctx.memory.password_of(&user.dn), Some(credential.password));
}

/// Lifecycle operations on a missing account are NotFound
#[tokio::test]
async fn test_account_lifecycle_unknown_user() {
    let ctx = TestContext::new();

    assert!(ctx.engine.account_info("ghost1").await.unwrap_err().is_not_found());
    assert!(ctx.engine.disable_user("ghost1").await.unwrap_err().is_not_found());
    assert!(ctx.engine.unlock_user("ghost1").await.unwrap_err().is_not_found());
    assert!(ctx
        .engine
        .reset_password("ghost1", Some("Some*Pass-Word".into()))
        .await
        .unwrap_err()
        .is_not_found());
}
