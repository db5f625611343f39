//! End-to-end tests for incremental account allocation.

use std::collections::HashSet;
use std::time::Duration;

use integration_tests::fixtures::{environment_request, usernames, users_request, PRODUCTION_OU};
use integration_tests::setup::TestContext;
use provisioner_core::CreateUsersRequest;

/// Numbering continues above the existing accounts
#[tokio::test]
async fn test_allocation_continues() {
    let ctx = TestContext::new();
    ctx.engine
        .create_environment(&environment_request(3))
        .await
        .unwrap();

    let result = ctx
        .engine
        .create_additional_users(&users_request(2))
        .await
        .unwrap();
    assert_eq!(usernames(&result.created_users), vec!["srv4", "srv5"]);
}

/// Gaps are never refilled
#[tokio::test]
async fn test_allocation_tolerates_gaps() {
    let ctx = TestContext::new();
    ctx.memory.add_container(PRODUCTION_OU);
    ctx.memory.add_user("srv1", PRODUCTION_OU);
    ctx.memory.add_user("srv3", PRODUCTION_OU);

    let result = ctx
        .engine
        .create_additional_users(&users_request(1))
        .await
        .unwrap();
    assert_eq!(usernames(&result.created_users), vec!["srv4"]);
}

/// Additional accounts take the tenant name from the production OU
#[tokio::test]
async fn test_additional_users_inherit_tenant_name() {
    let ctx = TestContext::new();
    ctx.engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();

    ctx.engine
        .create_additional_users(&users_request(1))
        .await
        .unwrap();

    let info = ctx.directory.account_info("srv2").await.unwrap();
    assert_eq!(info.description.as_deref(), Some("Acme Clinic"));
    assert_eq!(info.groups, vec!["RDS-SRV01".to_string()]);
}

/// Missing production OU is reported and nothing is created
#[tokio::test]
async fn test_unknown_environment() {
    let ctx = TestContext::new();
    let before = ctx.memory.created_count();

    let err = ctx
        .engine
        .create_additional_users(&CreateUsersRequest::new("SRV42", 2, "admin"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(ctx.memory.created_count(), before);
}

/// Concurrent calls for one host never hand out the same name
#[tokio::test]
async fn test_concurrent_allocation_serializes() {
    let ctx = TestContext::with_latency(Duration::from_millis(2));
    ctx.engine
        .create_environment(&environment_request(1))
        .await
        .unwrap();

    let first = {
        let engine = ctx.engine.clone();
        tokio::spawn(async move { engine.create_additional_users(&users_request(3)).await })
    };
    let second = {
        let engine = ctx.engine.clone();
        tokio::spawn(async move { engine.create_additional_users(&users_request(3)).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert!(first.is_complete());
    assert!(second.is_complete());

    let all: Vec<String> = usernames(&first.created_users)
        .into_iter()
        .chain(usernames(&second.created_users))
        .collect();
    let unique: HashSet<&String> = all.iter().collect();
    assert_eq!(all.len(), 6);
    assert_eq!(unique.len(), 6);

    let mut indices: Vec<u32> = all.iter().map(|u| u[3..].parse().unwrap()).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![2, 3, 4, 5, 6, 7]);
    assert!(ctx.engine.locks().is_empty());
}
