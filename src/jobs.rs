//! Background job substrate.

use std::sync::Arc;

use quick_cache::sync::Cache;
use uuid::Uuid;

use crate::error::{Error, Result};

/// State of a job.
///
/// Serialized as the upper case name, custom states as their own string.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    strum::EnumString,
    serde_with::SerializeDisplay,
    serde_with::DeserializeFromStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Started,
    Success,
    Failure,
    Retry,
    Revoked,
    #[strum(default)]
    Custom(String),
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Started => "STARTED",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::Retry => "RETRY",
            JobStatus::Revoked => "REVOKED",
            JobStatus::Custom(state) => state.as_str(),
        };
        write!(f, "{}", text)
    }
}

/// Result of `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub task_id: Uuid,
    pub status: JobStatus,
}

/// Result of `poll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    pub status: JobStatus,
    /// Human readable progress or outcome.
    pub info: String,
}

/// A unit of work; `Ok` carries the info text of the finished job.
pub type Job = Box<dyn FnOnce() -> Result<String> + Send + 'static>;

/// Queue executing jobs in the background.
pub trait JobQueue: Send + Sync {
    /// Hand `job` off for execution; it is run at most once.
    fn submit(&self, name: &str, job: Job) -> Result<JobHandle>;

    /// Current state of a job; unknown ids are not-found.
    fn poll(&self, task_id: &Uuid) -> Result<JobState>;
}

/// Number of job states kept by default.
pub const JOB_REGISTRY_CAPACITY: usize = 10_000;

/// Runs jobs on the tokio blocking pool and keeps their states in memory.
///
/// The registry is bounded; states of old jobs are evicted and then poll as
/// unknown.
#[derive(Clone, derivative::Derivative)]
#[derivative(Debug)]
pub struct LocalJobQueue {
    #[derivative(Debug = "ignore")]
    states: Arc<Cache<Uuid, JobState>>,
}

impl Default for LocalJobQueue {
    fn default() -> Self {
        Self::with_capacity(JOB_REGISTRY_CAPACITY)
    }
}

impl LocalJobQueue {
    /// Queue keeping the states of about `capacity` jobs.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Arc::new(Cache::new(capacity)),
        }
    }
}

impl JobQueue for LocalJobQueue {
    fn submit(&self, name: &str, job: Job) -> Result<JobHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Store(anyhow::anyhow!("no runtime to run jobs on: {}", e)))?;
        let task_id = Uuid::new_v4();
        self.states.insert(
            task_id,
            JobState {
                status: JobStatus::Pending,
                info: String::new(),
            },
        );

        let states = self.states.clone();
        let name = name.to_string();
        runtime.spawn_blocking(move || {
            tracing::info!("starting job {} ({})", task_id, name);
            states.insert(
                task_id,
                JobState {
                    status: JobStatus::Started,
                    info: String::new(),
                },
            );
            let state = match job() {
                Ok(info) => {
                    tracing::info!("job {} done: {}", task_id, info);
                    JobState {
                        status: JobStatus::Success,
                        info,
                    }
                }
                Err(e) => {
                    tracing::warn!("job {} failed: {}", task_id, e);
                    JobState {
                        status: JobStatus::Failure,
                        info: e.to_string(),
                    }
                }
            };
            states.insert(task_id, state);
        });

        Ok(JobHandle {
            task_id,
            status: JobStatus::Pending,
        })
    }

    fn poll(&self, task_id: &Uuid) -> Result<JobState> {
        self.states
            .get(task_id)
            .ok_or_else(|| Error::not_found(format!("job {}", task_id)))
    }
}
