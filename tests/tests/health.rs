//! Tests for component health checks.
//!
//! The health registry is process-global, so checks that flip it run in a
//! single test.

use std::sync::Arc;

use directory_client::{health as directory_health, DirectoryClient, DirectoryConfig, MemoryDirectory};
use host_inventory::{AgentQuery, HostInventoryProbe};
use integration_tests::setup::{test_inventory_config, TestContext};
use telemetry::{health, HealthStatus};

/// Directory and inventory checks drive the aggregated report
#[tokio::test]
async fn test_health_report_follows_components() {
    let ctx = TestContext::new();

    assert!(directory_health::check_connection(&ctx.directory).await);
    let live = HostInventoryProbe::new(test_inventory_config(), Arc::new(ctx.remote.clone()));
    host_inventory::record_health(&live);
    assert!(health().is_ready());
    assert_eq!(health().report().status, HealthStatus::Healthy);

    let disabled = HostInventoryProbe::new(
        test_inventory_config(),
        Arc::new(AgentQuery::disabled().unwrap()),
    );
    host_inventory::record_health(&disabled);
    let report = health().report();
    assert_eq!(report.status, HealthStatus::Degraded);
    assert!(health().is_ready());
    let inventory = report
        .components
        .iter()
        .find(|c| c.name == "inventory")
        .unwrap();
    assert!(inventory.message.is_some());

    ctx.memory.set_unavailable(true);
    assert!(!directory_health::check_connection(&ctx.directory).await);
    assert!(!health().is_ready());
    assert_eq!(health().report().status, HealthStatus::Unhealthy);

    let json = serde_json::to_value(health().report()).unwrap();
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["components"].as_array().unwrap().len(), 2);
}

/// Layout verification names the first missing container
#[tokio::test]
async fn test_verify_layout() {
    let ctx = TestContext::new();
    directory_health::verify_layout(&ctx.directory).await.unwrap();

    let config = DirectoryConfig::default();
    let empty = DirectoryClient::new(Arc::new(MemoryDirectory::new()), config.clone());
    let err = directory_health::verify_layout(&empty).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains(&config.tenant_root));
}
