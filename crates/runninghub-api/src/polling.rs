//! Fixed-cadence status polling.
//!
//! A submitted task is polled until it reaches a terminal state or the
//! attempt budget runs out.  The interval is constant, with no jitter or
//! backoff.  The attempt budget is the only way to stop waiting.

use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::traits::{Sleeper, WorkflowApi};
use crate::types::{PollPolicy, TaskState, TaskStatus};

/// Poll `task_id` until it completes, fails, or `policy.max_attempts` status
/// queries have been made.
///
/// Sleeps `policy.interval` between consecutive queries, never after the last
/// one.  Status queries are strictly sequential.
pub async fn poll_until_terminal(
    api: &dyn WorkflowApi,
    sleeper: &dyn Sleeper,
    task_id: &str,
    policy: PollPolicy,
) -> Result<TaskStatus> {
    for attempt in 1..=policy.max_attempts {
        let status = api.get_task_status(task_id).await?;
        debug!(task_id, attempt, state = %status.state, "polled task status");

        match status.state {
            TaskState::Completed => {
                info!(task_id, attempts = attempt, "task completed");
                return Ok(status);
            }
            TaskState::Failed | TaskState::Error => {
                let message = status
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_owned());
                warn!(task_id, attempt, error = %message, "task reported failure");
                return Err(ApiError::TaskFailed {
                    task_id: task_id.to_owned(),
                    message,
                });
            }
            TaskState::Unknown => {
                debug!(task_id, attempt, "unrecognised task state, continuing to poll");
            }
            TaskState::Pending | TaskState::Running => {}
        }

        if attempt < policy.max_attempts {
            sleeper.sleep(policy.interval).await;
        }
    }

    warn!(task_id, attempts = policy.max_attempts, "polling budget exhausted");
    Err(ApiError::PollingTimeout {
        task_id: task_id.to_owned(),
        attempts: policy.max_attempts,
    })
}
