//! The RunningHub host plugin.
//!
//! Owns the loaded configuration, the orchestrator built from it, and the
//! workflow listing cache.  Every configuration change that touches the
//! credentials or the request timeout builds a fresh client and
//! orchestrator; nothing is patched in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use runninghub_api::{
    PollingOptions, RunningHubClient, Sleeper, TaskStatus, TokioSleeper, WorkflowApi,
    WorkflowDescriptor, WorkflowInputs,
};
use tracing::{error, info, warn};

use crate::cache::WorkflowCache;
use crate::commands::{self, Command};
use crate::config::{ConfigUpdate, DEFAULT_CONFIG_PATH, PluginConfig};
use crate::error::{PluginError, Result};
use crate::orchestrator::{
    AccountSnapshot, ExecutionSettings, HealthReport, HealthStatus, Orchestrator, WorkflowSpec,
};
use crate::traits::{HostPlugin, PluginInfo};

/// Plugin name registered with the host.
pub const PLUGIN_NAME: &str = "runninghub";

/// Builds a client for a validated configuration.
pub type ApiFactory = Arc<dyn Fn(&PluginConfig) -> Arc<dyn WorkflowApi> + Send + Sync>;

fn http_api_factory() -> ApiFactory {
    Arc::new(|config: &PluginConfig| {
        Arc::new(RunningHubClient::with_timeout(
            config.credentials(),
            config.request_timeout(),
        )) as Arc<dyn WorkflowApi>
    })
}

/// RunningHub cloud workflows exposed as host commands.
pub struct RunningHubPlugin {
    config_path: PathBuf,
    config: Option<PluginConfig>,
    orchestrator: Option<Orchestrator>,
    cache: Option<WorkflowCache>,
    api_factory: ApiFactory,
    sleeper: Arc<dyn Sleeper>,
    env_overrides: bool,
}

impl RunningHubPlugin {
    /// A plugin reading its configuration from `config_path`.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            config: None,
            orchestrator: None,
            cache: None,
            api_factory: http_api_factory(),
            sleeper: Arc::new(TokioSleeper),
            env_overrides: true,
        }
    }

    /// Replace how clients are built from the configuration.
    pub fn with_api_factory(mut self, factory: ApiFactory) -> Self {
        self.api_factory = factory;
        self
    }

    /// Replace the timer used between poll attempts and batch waves.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Ignore `RUNNINGHUB_*` environment variables.
    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The loaded configuration, if any.
    pub fn config(&self) -> Option<&PluginConfig> {
        self.config.as_ref()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Load, validate and activate the configuration.
    pub async fn try_initialize(&mut self) -> Result<()> {
        let config = PluginConfig::load_or_init(&self.config_path).await?;
        self.activate(config, true)
    }

    /// Validate `config` and build the runtime state from it.
    ///
    /// `config` is kept as the persisted document; environment overrides are
    /// applied to a copy used for the client.  `rebuild_client` forces a new
    /// client, otherwise the current one is kept and only the execution
    /// settings are refreshed.
    fn activate(&mut self, config: PluginConfig, rebuild_client: bool) -> Result<()> {
        let mut effective = config.clone();
        if self.env_overrides {
            effective.apply_env_overrides();
        }
        self.config = Some(config);

        if let Err(e) = effective.validate() {
            self.orchestrator = None;
            self.cache = None;
            return Err(e);
        }

        let settings = ExecutionSettings::from_config(&effective);
        let orchestrator = match self.orchestrator.take() {
            Some(current) if !rebuild_client => current.with_settings(settings),
            _ => Orchestrator::new(
                (self.api_factory)(&effective),
                Arc::clone(&self.sleeper),
                settings,
            ),
        };
        self.orchestrator = Some(orchestrator);
        self.cache = Some(WorkflowCache::new(effective.cache_path));
        Ok(())
    }

    /// Apply a partial configuration change and persist it.
    ///
    /// Works before initialisation too, which is how placeholder credentials
    /// get replaced.  Returns whether the plugin is ready afterwards; a
    /// configuration that is still incomplete is not an error here.
    pub async fn update_config(&mut self, update: ConfigUpdate) -> Result<bool> {
        let mut config = match self.config.take() {
            Some(config) => config,
            None => PluginConfig::load_or_init(&self.config_path).await?,
        };

        let previous_timeout = config.request_timeout_secs;
        let credentials_changed = match config.update(update, &self.config_path).await {
            Ok(changed) => changed,
            Err(e) => {
                self.config = Some(config);
                return Err(e);
            }
        };

        let timeout_changed = config.request_timeout_secs != previous_timeout;
        let rebuild = credentials_changed || timeout_changed || self.orchestrator.is_none();
        match self.activate(config, rebuild) {
            Ok(()) => {
                info!(credentials_changed, timeout_changed, "RunningHub plugin reconfigured");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "configuration saved but still incomplete");
                Ok(false)
            }
        }
    }

    fn orchestrator(&self) -> Result<&Orchestrator> {
        self.orchestrator
            .as_ref()
            .ok_or_else(PluginError::not_initialized)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Run `workflow_id` (or the default workflow) to completion.
    pub async fn execute_workflow(
        &self,
        workflow_id: Option<&str>,
        inputs: WorkflowInputs,
        options: PollingOptions,
    ) -> Result<TaskStatus> {
        let spec = WorkflowSpec {
            workflow_id: workflow_id.map(str::to_owned),
            inputs,
            options,
        };
        self.orchestrator()?.run_workflow(&spec).await
    }

    /// Run the configured default workflow to completion.
    pub async fn execute_default_workflow(
        &self,
        inputs: WorkflowInputs,
        options: PollingOptions,
    ) -> Result<TaskStatus> {
        self.execute_workflow(None, inputs, options).await
    }

    /// Run many workflows with the account's concurrency limit.
    pub async fn execute_batch(&self, specs: &[WorkflowSpec]) -> Result<Vec<Result<TaskStatus>>> {
        self.orchestrator()?.run_workflows_parallel(specs).await
    }

    /// Account info and balance.
    pub async fn account(&self) -> Result<AccountSnapshot> {
        self.orchestrator()?.monitor_account().await
    }

    /// The workflow listing, cached for an hour unless `refresh` is set.
    pub async fn list_workflows(&self, refresh: bool) -> Result<Vec<WorkflowDescriptor>> {
        let orchestrator = self.orchestrator()?;
        let cache = self.cache.as_ref().ok_or_else(PluginError::not_initialized)?;
        cache
            .get_workflows(orchestrator.api().as_ref(), refresh)
            .await
    }

    /// Connectivity probe.  A plugin that is not ready reports unhealthy.
    pub async fn health_check(&self) -> HealthReport {
        match self.orchestrator() {
            Ok(orchestrator) => orchestrator.health_check().await,
            Err(e) => HealthReport {
                status: HealthStatus::Unhealthy,
                account_id: None,
                account_type: None,
                error: Some(e.to_string()),
                checked_at: chrono::Utc::now(),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    async fn handle_status(&self) -> String {
        let health = self.health_check().await;
        if !health.is_healthy() {
            return commands::format_unhealthy(&health);
        }
        match self.account().await {
            Ok(snapshot) => commands::format_status(&health, &snapshot),
            Err(e) => commands::error_message("checking status", &e),
        }
    }

    async fn handle_execute(&self, args: &[String]) -> String {
        let request = match commands::parse_execute_args(args) {
            Ok(request) => request,
            Err(message) => return message,
        };

        let started = Instant::now();
        match self
            .execute_workflow(
                Some(request.workflow_id.as_str()),
                request.inputs,
                PollingOptions::default(),
            )
            .await
        {
            Ok(status) => {
                commands::format_execution(&request.workflow_id, started.elapsed(), &status)
            }
            Err(e) => commands::error_message("executing workflow", &e),
        }
    }

    async fn handle_list(&self, args: &[String]) -> String {
        match self.list_workflows(commands::wants_refresh(args)).await {
            Ok(workflows) => commands::format_workflow_list(&workflows),
            Err(e) => commands::error_message("listing workflows", &e),
        }
    }
}

impl Default for RunningHubPlugin {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

#[async_trait]
impl HostPlugin for RunningHubPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            description: "RunningHub cloud workflow integration".to_owned(),
            commands: commands::command_definitions(),
        }
    }

    async fn initialize(&mut self) -> bool {
        match self.try_initialize().await {
            Ok(()) => {
                info!(config = %self.config_path.display(), "RunningHub plugin initialized");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to initialize RunningHub plugin");
                false
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.orchestrator.is_some()
    }

    async fn process_command(&self, command: &str, args: &[String]) -> String {
        let Some(parsed) = Command::parse(command) else {
            return commands::unknown_command_message(command);
        };
        if parsed == Command::Help {
            return commands::help_text();
        }
        if !self.is_ready() {
            return commands::not_ready_message();
        }

        match parsed {
            Command::Status => self.handle_status().await,
            Command::Execute => self.handle_execute(args).await,
            Command::List => self.handle_list(args).await,
            Command::Help => commands::help_text(),
        }
    }
}
