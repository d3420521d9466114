//! RunningHub host plugin: run cloud ComfyUI workflows from host commands.
//!
//! This crate provides:
//!
//! - **Orchestrator**: runs a workflow to completion, runs batches in waves
//!   bounded by the account's concurrency limit, and reports account health.
//!
//! - **Workflow cache**: the workflow listing persisted to a JSON file and
//!   served for an hour before the service is asked again.
//!
//! - **Configuration**: a JSON config file created with defaults on first
//!   start, validated before use, and rewritten on every update.
//!
//! - **Host plugin**: [`RunningHubPlugin`] implements [`HostPlugin`], turning
//!   `runninghub-status`, `runninghub-list`, `runninghub-execute` and
//!   `runninghub-help` into text responses.
//!
//! # Example
//!
//! ```rust,no_run
//! use runninghub_plugin::{HostPlugin, RunningHubPlugin};
//!
//! # async fn run() {
//! let mut plugin = RunningHubPlugin::new("./runninghub-config.json");
//! if plugin.initialize().await {
//!     let reply = plugin.process_command("runninghub-list", &["--refresh".into()]).await;
//!     println!("{reply}");
//! }
//! # }
//! ```

pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod plugin;
pub mod traits;

pub use cache::{WorkflowCache, WorkflowCacheEntry};
pub use config::{ConcurrencyPolicy, ConfigUpdate, PluginConfig};
pub use error::{PluginError, Result};
pub use orchestrator::{
    AccountSnapshot, ExecutionSettings, HealthReport, HealthStatus, Orchestrator, WorkflowSpec,
};
pub use plugin::{ApiFactory, RunningHubPlugin};
pub use traits::{CommandDefinition, HostPlugin, PluginInfo};
