//! RunningHub cloud workflow client.
//!
//! This crate wraps the RunningHub HTTP API:
//!
//! - **[`WorkflowApi`]**: the remote calls (submit, status, account,
//!   balance, workflow listing) behind one trait, implemented over HTTP by
//!   [`RunningHubClient`].
//!
//! - **[`poll_until_terminal`]**: fixed-cadence polling of a task until it
//!   completes, fails, or runs out of attempts.
//!
//! - **[`Sleeper`]**: the timer seam used between poll attempts, so callers
//!   can run the polling loop without real delays.
//!
//! # Example
//!
//! ```rust,no_run
//! use runninghub_api::{Credentials, PollPolicy, RunningHubClient, WorkflowApi, WorkflowInputs};
//!
//! # async fn run() -> runninghub_api::Result<()> {
//! let client = RunningHubClient::new(Credentials::new("my-key", "https://www.runninghub.cn"));
//! let handle = client.submit_workflow("1850925505116598274", &WorkflowInputs::default()).await?;
//! let status = client.poll_until_terminal(&handle.task_id, PollPolicy::default()).await?;
//! println!("{}", status.payload);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod polling;
pub mod traits;
pub mod types;

pub use client::RunningHubClient;
pub use error::{ApiError, Result};
pub use polling::poll_until_terminal;
pub use traits::{Sleeper, TokioSleeper, WorkflowApi};
pub use types::{
    API_KEY_PLACEHOLDER, AccountInfo, AccountType, BalanceInfo, Credentials, DEFAULT_BASE_URL,
    NodeInfo, PollPolicy, PollingOptions, TaskHandle, TaskState, TaskStatus,
    WORKFLOW_ID_PLACEHOLDER, WorkflowDescriptor, WorkflowInputs,
};
