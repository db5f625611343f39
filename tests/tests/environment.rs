//! End-to-end tests for environment creation.

use integration_tests::fixtures::{
    environment_request, usernames, CLOUD_OU, COMPUTERS, PRODUCTION_OU, REQUESTED_BY, TENANT,
};
use integration_tests::setup::TestContext;
use provisioner_core::CreateEnvironmentRequest;

/// Naming convention for every object of the environment
#[tokio::test]
async fn test_environment_naming() {
    let ctx = TestContext::new();

    let result = ctx
        .engine
        .create_environment(&environment_request(3))
        .await
        .unwrap();

    assert_eq!(result.tenant_name, TENANT);
    assert_eq!(result.production_ou_path, PRODUCTION_OU);
    assert_eq!(result.cloud_ou_path, CLOUD_OU);
    assert_eq!(result.group_name, "RDS-SRV01");
    assert_eq!(usernames(&result.created_users), vec!["srv1", "srv2", "srv3"]);
}

/// Created accounts carry their credential, audit fields and group membership
#[tokio::test]
async fn test_accounts_are_fully_provisioned() {
    let ctx = TestContext::new();

    let result = ctx
        .engine
        .create_environment(&environment_request(2))
        .await
        .unwrap();

    for credential in &result.created_users {
        let dn = format!("CN={},{}", credential.username, PRODUCTION_OU);
        let entry = ctx.memory.entry(&dn).expect("account exists");
        assert_eq!(ctx.memory.password_of(&dn), Some(credential.password.clone()));
        assert_eq!(entry.first("description"), Some(TENANT));
        assert_eq!(entry.first("info"), Some(REQUESTED_BY));

        let info = ctx.directory.account_info(&credential.username).await.unwrap();
        assert!(!info.disabled);
        assert_eq!(info.groups, vec!["RDS-SRV01".to_string()]);
    }

    let group = ctx
        .memory
        .entry("CN=RDS-SRV01,OU=Groups,DC=labs,DC=local")
        .unwrap();
    assert_eq!(group.values("member").len(), 2);
    assert_eq!(group.first("description"), Some(TENANT));
}

/// Host is moved into its cloud OU
#[tokio::test]
async fn test_host_moved_to_cloud_ou() {
    let ctx = TestContext::new();

    ctx.engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();

    assert!(ctx.memory.entry(&format!("CN=SRV01,{COMPUTERS}")).is_none());
    assert!(ctx.memory.entry(&format!("CN=SRV01,{CLOUD_OU}")).is_some());
}

/// Missing host aborts before any account is created
#[tokio::test]
async fn test_missing_host_aborts() {
    let ctx = TestContext::new();
    let request = CreateEnvironmentRequest::new(TENANT, "SRV99", 3, REQUESTED_BY);

    let err = ctx.engine.create_environment(&request).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), "DIR_404");

    assert!(ctx
        .memory
        .entry("CN=srv1,OU=PROD_SRV99,OU=Clinic,DC=labs,DC=local")
        .is_none());
    assert!(ctx
        .memory
        .entry("CN=RDS-SRV99,OU=Groups,DC=labs,DC=local")
        .is_none());
}

/// A failing account is recorded and the remaining accounts are still created
#[tokio::test]
async fn test_per_account_failure_continues() {
    let ctx = TestContext::new();
    ctx.memory.fail_creates_for("srv2");

    let result = ctx
        .engine
        .create_environment(&environment_request(3))
        .await
        .unwrap();

    assert_eq!(usernames(&result.created_users), vec!["srv1", "srv3"]);
    assert_eq!(result.failed_users.len(), 1);
    assert_eq!(result.failed_users[0].username, "srv2");
    assert!(result.failed_users[0].reason.contains("INTERNAL_500"));
}

/// Re-running creation reuses the structure and never re-issues existing accounts
#[tokio::test]
async fn test_rerun_is_idempotent_for_structure() {
    let ctx = TestContext::new();

    let first = ctx
        .engine
        .create_environment(&environment_request(2))
        .await
        .unwrap();
    let second = ctx
        .engine
        .create_environment(&environment_request(2))
        .await
        .unwrap();

    assert_eq!(first.production_ou_path, second.production_ou_path);
    assert_eq!(first.cloud_ou_path, second.cloud_ou_path);
    assert!(second.created_users.is_empty());
    assert_eq!(second.failed_users.len(), 2);

    let dn = format!("CN=srv1,{PRODUCTION_OU}");
    assert_eq!(
        ctx.memory.password_of(&dn),
        Some(first.created_users[0].password.clone())
    );
}

/// Remote-access id is attached when the host reports one
#[tokio::test]
async fn test_remote_id_attached() {
    let ctx = TestContext::new();
    ctx.remote.set_remote_id("123 456 789");

    let result = ctx
        .engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();
    assert_eq!(result.host_remote_id.as_deref(), Some("123 456 789"));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["hostRemoteId"], "123 456 789");
    assert_eq!(json["productionOUPath"], PRODUCTION_OU);
}

/// Inventory failures never fail provisioning
#[tokio::test]
async fn test_probe_failure_is_absorbed() {
    let ctx = TestContext::new();
    ctx.remote.set_should_fail(true);

    let result = ctx
        .engine
        .create_environment(&environment_request(2))
        .await
        .unwrap();
    assert_eq!(result.created_users.len(), 2);
    assert_eq!(result.host_remote_id, None);
    assert!(ctx.remote.call_count() >= 1);
}

/// Existing production OU audit fields are left untouched
#[tokio::test]
async fn test_production_ou_audit_fields_filled_once() {
    let ctx = TestContext::new();

    ctx.engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();
    let renamed = CreateEnvironmentRequest::new("Renamed Tenant", "SRV01", 1, "someone-else");
    ctx.engine.create_environment(&renamed).await.unwrap();

    let ou = ctx.memory.entry(PRODUCTION_OU).unwrap();
    assert_eq!(ou.first("description"), Some(TENANT));
    assert_eq!(ou.first("info"), Some(REQUESTED_BY));
}
