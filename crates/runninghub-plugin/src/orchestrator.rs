//! Workflow execution on top of the RunningHub client.
//!
//! The orchestrator runs single workflows to completion, runs batches in
//! waves bounded by the account's concurrency limit, and gathers account
//! telemetry.  It owns an immutable settings snapshot; configuration changes
//! build a new orchestrator instead of mutating this one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use runninghub_api::{
    AccountInfo, AccountType, BalanceInfo, PollPolicy, PollingOptions, Sleeper, TaskStatus,
    WORKFLOW_ID_PLACEHOLDER, WorkflowApi, WorkflowInputs, poll_until_terminal,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConcurrencyPolicy, PluginConfig};
use crate::error::{PluginError, Result};

// ---------------------------------------------------------------------------
// Specs and settings
// ---------------------------------------------------------------------------

/// One workflow run request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    /// Target workflow; `None` runs the configured default.
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub inputs: WorkflowInputs,
    #[serde(default)]
    pub options: PollingOptions,
}

impl WorkflowSpec {
    pub fn new(workflow_id: impl Into<String>, inputs: WorkflowInputs) -> Self {
        Self {
            workflow_id: Some(workflow_id.into()),
            inputs,
            options: PollingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PollingOptions) -> Self {
        self.options = options;
        self
    }
}

/// Execution settings derived from the plugin configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    pub default_workflow_id: String,
    pub poll_policy: PollPolicy,
    pub concurrency: ConcurrencyPolicy,
    /// Pause between batch waves.
    pub wave_delay: Duration,
}

impl ExecutionSettings {
    pub fn from_config(config: &PluginConfig) -> Self {
        Self {
            default_workflow_id: config.default_workflow_id.clone(),
            poll_policy: config.poll_policy(),
            concurrency: config.concurrency,
            wave_delay: config.wave_delay(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Account and balance observed together.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub account: AccountInfo,
    pub balance: BalanceInfo,
    pub observed_at: DateTime<Utc>,
}

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of [`Orchestrator::health_check`].  Balance is not included.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs workflows against a [`WorkflowApi`].
pub struct Orchestrator {
    api: Arc<dyn WorkflowApi>,
    sleeper: Arc<dyn Sleeper>,
    settings: ExecutionSettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn WorkflowApi>,
        sleeper: Arc<dyn Sleeper>,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            api,
            sleeper,
            settings,
        }
    }

    /// The client this orchestrator talks to.
    pub fn api(&self) -> &Arc<dyn WorkflowApi> {
        &self.api
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// The same client with different settings.
    pub fn with_settings(&self, settings: ExecutionSettings) -> Self {
        Self {
            api: Arc::clone(&self.api),
            sleeper: Arc::clone(&self.sleeper),
            settings,
        }
    }

    /// Submit one workflow and poll it to a terminal state.
    ///
    /// Client errors propagate unchanged.
    pub async fn run_workflow(&self, spec: &WorkflowSpec) -> Result<TaskStatus> {
        let workflow_id = spec
            .workflow_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(self.settings.default_workflow_id.as_str())
            .trim();
        if workflow_id.is_empty() || workflow_id == WORKFLOW_ID_PLACEHOLDER {
            return Err(PluginError::Config(
                "no workflow ID given and no default workflow configured".into(),
            ));
        }
        let policy = self.settings.poll_policy.with_overrides(&spec.options);

        info!(workflow_id, "executing workflow");
        let handle = self.api.submit_workflow(workflow_id, &spec.inputs).await?;
        debug!(
            workflow_id,
            task_id = %handle.task_id,
            max_attempts = policy.max_attempts,
            interval_ms = policy.interval.as_millis() as u64,
            "waiting for workflow completion"
        );

        let status =
            poll_until_terminal(self.api.as_ref(), self.sleeper.as_ref(), &handle.task_id, policy)
                .await?;
        info!(workflow_id, task_id = %status.task_id, "workflow completed");
        Ok(status)
    }

    /// Run `specs` in waves of at most `concurrency_limit`.
    ///
    /// Every item settles on its own: a failure never cancels its siblings.
    /// Outcomes are returned in input order.  The wave delay is applied
    /// between waves, not after the last one.
    pub async fn run_workflows_batched(
        &self,
        specs: &[WorkflowSpec],
        concurrency_limit: usize,
    ) -> Vec<Result<TaskStatus>> {
        let wave_size = concurrency_limit.max(1);
        let wave_count = specs.len().div_ceil(wave_size);
        let mut outcomes = Vec::with_capacity(specs.len());

        for (index, wave) in specs.chunks(wave_size).enumerate() {
            debug!(wave = index + 1, of = wave_count, size = wave.len(), "dispatching wave");
            let results = join_all(wave.iter().map(|spec| self.run_workflow(spec))).await;
            outcomes.extend(results);

            if index + 1 < wave_count {
                self.sleeper.sleep(self.settings.wave_delay).await;
            }
        }

        let failed = outcomes.iter().filter(|r| r.is_err()).count();
        info!(total = outcomes.len(), failed, "batch finished");
        outcomes
    }

    /// Run `specs` with the concurrency limit of the current account tier.
    pub async fn run_workflows_parallel(
        &self,
        specs: &[WorkflowSpec],
    ) -> Result<Vec<Result<TaskStatus>>> {
        let account = self.api.get_account_info().await?;
        let limit = self.settings.concurrency.limit_for(account.account_type);
        info!(
            account_type = %account.account_type,
            limit,
            total = specs.len(),
            "executing workflows concurrently"
        );
        Ok(self.run_workflows_batched(specs, limit).await)
    }

    /// Fetch account info and balance concurrently.  Either failure fails
    /// the call.
    pub async fn monitor_account(&self) -> Result<AccountSnapshot> {
        let (account, balance) =
            tokio::try_join!(self.api.get_account_info(), self.api.get_balance())?;
        Ok(AccountSnapshot {
            account,
            balance,
            observed_at: Utc::now(),
        })
    }

    /// Probe the service with one account lookup.  Never fails: errors are
    /// reported as an unhealthy status.
    pub async fn health_check(&self) -> HealthReport {
        match self.api.get_account_info().await {
            Ok(account) => HealthReport {
                status: HealthStatus::Healthy,
                account_id: Some(account.account_id),
                account_type: Some(account.account_type),
                error: None,
                checked_at: Utc::now(),
            },
            Err(e) => {
                warn!(error = %e, "RunningHub health check failed");
                HealthReport {
                    status: HealthStatus::Unhealthy,
                    account_id: None,
                    account_type: None,
                    error: Some(e.to_string()),
                    checked_at: Utc::now(),
                }
            }
        }
    }
}
