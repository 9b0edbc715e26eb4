use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{DirectoryError, Result};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One discovery batch: a region scanned for a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryJob {
    /// Idempotency key of the job
    pub key: String,
    pub region_id: String,
    pub category_code: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl DiscoveryJob {
    pub fn new(key: impl Into<String>, region_id: impl Into<String>, category_code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region_id: region_id.into(),
            category_code: category_code.into(),
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
        }
    }
}

/// Runs a job with a capped number of retries. A job that keeps failing ends
/// up `Failed` with its last error and is reported back to the caller.
#[derive(Debug, Clone)]
pub struct JobRunner {
    max_retries: u32,
    retry_delay: Duration,
}

impl JobRunner {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_delay: Duration::ZERO,
        }
    }

    /// Base delay before a retry, multiplied by the attempt number
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub async fn run<T, F, Fut>(&self, job: &mut DiscoveryJob, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.max_retries + 1;
        job.status = JobStatus::Running;

        let mut attempt = 0;
        loop {
            attempt += 1;
            job.attempts = attempt;
            match operation(attempt).await {
                Ok(value) => {
                    job.status = JobStatus::Succeeded;
                    job.last_error = None;
                    metrics::discovery::job_succeeded();
                    info!(job = %job.key, attempt, "Discovery job succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    job.last_error = Some(message.clone());

                    if attempt >= max_attempts {
                        job.status = JobStatus::Failed;
                        metrics::discovery::job_failed();
                        error!(job = %job.key, attempts = attempt, error = %message, "Discovery job failed, retries exhausted");
                        return Err(DirectoryError::RetriesExhausted {
                            job: job.key.clone(),
                            attempts: attempt,
                            last_error: message,
                        });
                    }

                    metrics::discovery::job_retried();
                    warn!(job = %job.key, attempt, error = %message, "Discovery job attempt failed, retrying");
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }
    }
}
