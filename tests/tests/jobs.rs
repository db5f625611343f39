//! End-to-end tests for the background job queue.

use std::time::{Duration, Instant};

use integration_tests::fixtures::{environment_request, environment_request_for, usernames, users_request};
use integration_tests::setup::TestContext;
use provisioning_engine::{Job, JobOutput, ProvisioningConfig};
use telemetry::metrics;

/// Jobs complete through the queue
#[tokio::test]
async fn test_queue_runs_jobs() {
    let ctx = TestContext::new();
    let queue = ctx.queue(&ProvisioningConfig::default());

    let environment = queue.create_environment(environment_request(2)).await.unwrap();
    assert_eq!(environment.created_users.len(), 2);

    let users = queue.create_additional_users(users_request(1)).await.unwrap();
    assert_eq!(usernames(&users.created_users), vec!["srv3"]);
}

/// A job that outlives its deadline reports DeadlineExceeded
#[tokio::test]
async fn test_deadline_exceeded() {
    let ctx = TestContext::with_latency(Duration::from_millis(50));
    let queue = ctx.queue(&ProvisioningConfig::default());

    let err = queue
        .submit_with_deadline(
            Job::CreateEnvironment(environment_request(5)),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "JOB_408");
}

/// Validation errors come back through the queue untouched
#[tokio::test]
async fn test_validation_through_queue() {
    let ctx = TestContext::new();
    let queue = ctx.queue(&ProvisioningConfig::default());

    let err = queue
        .submit(Job::CreateUsers(provisioner_core::CreateUsersRequest::new(
            "SRV01", 0, "admin",
        )))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALID_001");
}

/// Different hosts provision concurrently
#[tokio::test]
async fn test_different_hosts_run_concurrently() {
    let ctx = TestContext::with_latency(Duration::from_millis(20));
    ctx.add_host("APP07");
    ctx.add_host("WEB01");
    let queue = ctx.queue(&ProvisioningConfig::default());

    let started = Instant::now();
    queue
        .create_environment(environment_request_for("APP07", 2))
        .await
        .unwrap();
    let single = started.elapsed();

    let started = Instant::now();
    let (a, b) = tokio::join!(
        queue.submit(Job::CreateEnvironment(environment_request(2))),
        queue.submit(Job::CreateEnvironment(environment_request_for("WEB01", 2))),
    );
    let pair = started.elapsed();

    match (a.unwrap(), b.unwrap()) {
        (JobOutput::Environment(a), JobOutput::Environment(b)) => {
            assert_eq!(usernames(&a.created_users), vec!["srv1", "srv2"]);
            assert_eq!(b.group_name, "RDS-WEB01");
            assert_eq!(usernames(&b.created_users), vec!["web1", "web2"]);
        }
        other => panic!("unexpected outputs: {other:?}"),
    }
    assert!(
        pair < single * 3 / 2,
        "two hosts took {pair:?}, one host took {single:?}"
    );
}

/// A full queue rejects new jobs instead of blocking
#[tokio::test]
async fn test_full_queue_rejects_jobs() {
    let ctx = TestContext::new();
    ctx.add_host("WEB01");
    let queue = ctx.queue(&ProvisioningConfig {
        queue_capacity: 1,
        ..ProvisioningConfig::default()
    });
    let rejected_before = metrics().jobs_rejected.get();

    // The worker cannot drain the channel until this task yields.
    let (accepted, rejected) = tokio::join!(
        queue.create_environment(environment_request(1)),
        queue.create_environment(environment_request_for("WEB01", 1)),
    );

    assert_eq!(accepted.unwrap().created_users.len(), 1);
    let err = rejected.unwrap_err();
    assert_eq!(err.code(), "INTERNAL_500");
    assert!(err.to_string().contains("queue is full"));
    assert!(metrics().jobs_rejected.get() > rejected_before);

    let retried = queue
        .create_environment(environment_request_for("WEB01", 1))
        .await
        .unwrap();
    assert_eq!(usernames(&retried.created_users), vec!["web1"]);
}
