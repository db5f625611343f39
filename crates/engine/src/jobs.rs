//! Background job queue for provisioning calls.
//!
//! Callers submit a job and await its reply; directory I/O runs on tasks owned
//! by the queue worker. Each job is bounded by a deadline. Jobs for different
//! hosts run concurrently, jobs for one host serialize on its host lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use provisioner_core::{
    CreateEnvironmentRequest, CreateUsersRequest, EnvironmentResult, Error, Result, UsersResult,
};
use telemetry::metrics;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ProvisioningConfig;
use crate::engine::ProvisioningEngine;

/// Work the queue accepts.
#[derive(Debug, Clone)]
pub enum Job {
    CreateEnvironment(CreateEnvironmentRequest),
    CreateUsers(CreateUsersRequest),
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEnvironment(_) => "create_environment",
            Self::CreateUsers(_) => "create_additional_users",
        }
    }

    pub fn host(&self) -> &str {
        match self {
            Self::CreateEnvironment(r) => &r.host_identifier,
            Self::CreateUsers(r) => &r.host_identifier,
        }
    }
}

/// Result of a completed job.
#[derive(Debug, Clone)]
pub enum JobOutput {
    Environment(EnvironmentResult),
    Users(UsersResult),
}

struct Envelope {
    id: Uuid,
    job: Job,
    deadline: Duration,
    reply: oneshot::Sender<Result<JobOutput>>,
}

/// Handle for submitting jobs to the provisioning worker.
#[derive(Clone)]
pub struct ProvisioningQueue {
    sender: mpsc::Sender<Envelope>,
    default_deadline: Duration,
}

impl ProvisioningQueue {
    /// Spawn the worker and return a handle to it.
    ///
    /// The worker stops once every handle has been dropped.
    pub fn start(
        engine: Arc<ProvisioningEngine>,
        config: &ProvisioningConfig,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(engine, receiver));
        info!(capacity = config.queue_capacity, "Provisioning queue started");

        (
            Self {
                sender,
                default_deadline: config.deadline(),
            },
            worker,
        )
    }

    pub async fn submit(&self, job: Job) -> Result<JobOutput> {
        self.submit_with_deadline(job, self.default_deadline).await
    }

    /// Submit a job and wait for its result or its deadline.
    pub async fn submit_with_deadline(&self, job: Job, deadline: Duration) -> Result<JobOutput> {
        let id = Uuid::new_v4();
        let (reply, response) = oneshot::channel();
        debug!(job_id = %id, job = job.name(), host = job.host(), "Submitting job");

        let envelope = Envelope {
            id,
            job,
            deadline,
            reply,
        };
        metrics().queue_depth.inc();
        match self.sender.try_send(envelope) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics().queue_depth.dec();
                metrics().jobs_rejected.inc();
                warn!(job_id = %id, "Provisioning queue full, rejecting job");
                return Err(Error::unexpected("provisioning queue is full"));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                metrics().queue_depth.dec();
                metrics().jobs_rejected.inc();
                return Err(Error::unexpected("provisioning worker has stopped"));
            }
        }

        response
            .await
            .map_err(|_| Error::unexpected("provisioning worker dropped the job"))?
    }

    pub async fn create_environment(
        &self,
        request: CreateEnvironmentRequest,
    ) -> Result<EnvironmentResult> {
        match self.submit(Job::CreateEnvironment(request)).await? {
            JobOutput::Environment(result) => Ok(result),
            JobOutput::Users(_) => Err(Error::unexpected("mismatched job output")),
        }
    }

    pub async fn create_additional_users(&self, request: CreateUsersRequest) -> Result<UsersResult> {
        match self.submit(Job::CreateUsers(request)).await? {
            JobOutput::Users(result) => Ok(result),
            JobOutput::Environment(_) => Err(Error::unexpected("mismatched job output")),
        }
    }
}

async fn run_worker(engine: Arc<ProvisioningEngine>, mut receiver: mpsc::Receiver<Envelope>) {
    while let Some(envelope) = receiver.recv().await {
        metrics().queue_depth.dec();
        let engine = engine.clone();
        tokio::spawn(run_job(engine, envelope));
    }
    debug!("Provisioning queue closed, worker exiting");
}

async fn run_job(engine: Arc<ProvisioningEngine>, envelope: Envelope) {
    let Envelope {
        id,
        job,
        deadline,
        reply,
    } = envelope;
    let name = job.name();
    let started = Instant::now();

    let work = async {
        match &job {
            Job::CreateEnvironment(request) => engine
                .create_environment(request)
                .await
                .map(JobOutput::Environment),
            Job::CreateUsers(request) => engine
                .create_additional_users(request)
                .await
                .map(JobOutput::Users),
        }
    };

    let result = match timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            metrics().jobs_timed_out.inc();
            error!(job_id = %id, job = name, host = job.host(), "Job exceeded its deadline");
            Err(Error::deadline(name, deadline.as_secs()))
        }
    };

    metrics()
        .job_latency_ms
        .observe(started.elapsed().as_millis() as u64);
    if let Err(e) = &result {
        debug!(job_id = %id, job = name, error = %e, "Job failed");
    }

    if reply.send(result).is_err() {
        warn!(job_id = %id, "Job finished after its caller went away");
    }
}
