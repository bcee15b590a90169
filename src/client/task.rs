//! Waiting for long-running array tasks.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::DmeClient;
use super::error::DmeError;
use super::paths;
use super::transport::Method;
use super::types::{TaskInfo, TaskResponse, TaskStatus};

/// Poll intervals and wall-clock ceiling for task completion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TaskPolicy {
    /// Delay before the second poll.
    pub initial_interval: Duration,
    /// Upper bound for a single delay.
    pub max_interval: Duration,
    /// Total time after which waiting gives up.
    pub timeout: Duration,
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(20 * 60),
        }
    }
}

/// Doubling delay sequence capped at a maximum.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    /// Starts a sequence from the policy's initial interval.
    #[must_use]
    pub fn new(policy: &TaskPolicy) -> Self {
        Self {
            next: policy.initial_interval.min(policy.max_interval),
            max: policy.max_interval,
        }
    }

    /// Returns the current delay and doubles the next one.
    pub fn next_interval(&mut self) -> Duration {
        let current = self.next;
        self.next = current.checked_mul(2).unwrap_or(self.max).min(self.max);
        current
    }
}

impl DmeClient {
    /// Submits a task-producing request and waits for the task to finish.
    pub(crate) async fn wait_task<B>(&self, method: Method, path: &str, body: &B) -> Result<(), DmeError>
    where
        B: Serialize + ?Sized,
    {
        let response: TaskResponse = self.graceful_send(method, path, body).await?;
        let task_id = response.task_id.trim();
        if task_id.is_empty() {
            return Err(DmeError::EmptyTask {
                path: path.to_owned(),
            });
        }
        self.await_task(task_id).await
    }

    /// Polls `task_id` until it reaches a terminal state.
    ///
    /// A task that is not yet listed counts as pending.
    ///
    /// # Errors
    ///
    /// Returns [`DmeError::TaskFailed`] or [`DmeError::TaskUnknownStatus`]
    /// for unsuccessful outcomes, [`DmeError::TaskTimeout`] once the policy
    /// ceiling passes, and any polling error unchanged.
    pub async fn await_task(&self, task_id: &str) -> Result<(), DmeError> {
        let policy = self.task_policy;
        let started = Instant::now();
        let mut backoff = Backoff::new(&policy);

        loop {
            let infos = self.task_infos(task_id).await?;
            match infos.into_iter().find(|info| info.id == task_id) {
                None => tracing::debug!(task_id, "task not listed yet"),
                Some(info) => match TaskStatus::from_code(info.status) {
                    TaskStatus::Init | TaskStatus::Running => {
                        tracing::debug!(task_id, status = info.status, "task pending");
                    }
                    TaskStatus::Success => {
                        tracing::info!(task_id, "task succeeded");
                        return Ok(());
                    }
                    TaskStatus::Terminal(outcome) => {
                        return Err(DmeError::TaskFailed {
                            task_id: task_id.to_owned(),
                            outcome,
                            detail: info.detail.unwrap_or_default(),
                        });
                    }
                    TaskStatus::Unknown(status) => {
                        return Err(DmeError::TaskUnknownStatus {
                            task_id: task_id.to_owned(),
                            status,
                        });
                    }
                },
            }

            let waited = started.elapsed();
            let Some(remaining) = policy
                .timeout
                .checked_sub(waited)
                .filter(|remaining| !remaining.is_zero())
            else {
                return Err(DmeError::TaskTimeout {
                    task_id: task_id.to_owned(),
                    waited,
                });
            };
            tokio::time::sleep(backoff.next_interval().min(remaining)).await;
        }
    }

    /// Returns the status entries of a task and its sub-tasks.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn task_infos(&self, task_id: &str) -> Result<Vec<TaskInfo>, DmeError> {
        self.graceful_get(&paths::task(task_id)).await
    }
}
