//! Seams between the remote service and everything built on top of it.
//!
//! [`WorkflowApi`] is the set of remote calls the orchestrator, cache and
//! command surface rely on; [`RunningHubClient`](crate::RunningHubClient) is
//! the HTTP implementation.  All timed waits go through
//! [`Sleeper`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AccountInfo, BalanceInfo, TaskHandle, TaskStatus, WorkflowDescriptor, WorkflowInputs};

/// The remote calls exposed by the RunningHub service.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Start a run of `workflow_id` and return its task handle.
    async fn submit_workflow(&self, workflow_id: &str, inputs: &WorkflowInputs)
    -> Result<TaskHandle>;

    /// Fetch the current status of a task.
    async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus>;

    /// Fetch account details.
    async fn get_account_info(&self) -> Result<AccountInfo>;

    /// Fetch account balance.
    async fn get_balance(&self) -> Result<BalanceInfo>;

    /// List the workflows available to the account.
    async fn list_workflows(&self) -> Result<Vec<WorkflowDescriptor>>;
}

/// Timer-based suspension.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
