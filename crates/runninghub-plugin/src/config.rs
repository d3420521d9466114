//! Plugin configuration: a human-editable JSON document on disk.
//!
//! The file is created with placeholder defaults the first time the plugin
//! starts, validated before any remote call, and rewritten wholesale on every
//! update.  Environment variables (`RUNNINGHUB_API_KEY`,
//! `RUNNINGHUB_BASE_URL`, `RUNNINGHUB_WORKFLOW_ID`) override file values in
//! memory without being persisted.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use runninghub_api::{
    API_KEY_PLACEHOLDER, AccountType, Credentials, DEFAULT_BASE_URL, PollPolicy,
    WORKFLOW_ID_PLACEHOLDER,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PluginError, Result};

/// Default location of the config file.
pub const DEFAULT_CONFIG_PATH: &str = "./runninghub-config.json";

/// Default location of the workflow listing cache.
pub const DEFAULT_CACHE_PATH: &str = "./workflow-cache.json";

/// Environment variable overriding `apiKey`.
pub const ENV_API_KEY: &str = "RUNNINGHUB_API_KEY";
/// Environment variable overriding `baseUrl`.
pub const ENV_BASE_URL: &str = "RUNNINGHUB_BASE_URL";
/// Environment variable overriding `defaultWorkflowId`.
pub const ENV_WORKFLOW_ID: &str = "RUNNINGHUB_WORKFLOW_ID";

// ---------------------------------------------------------------------------
// Concurrency policy
// ---------------------------------------------------------------------------

/// How many workflows may run at once for each account tier.
///
/// The service does not advertise these limits; they are operator policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyPolicy {
    pub standard: usize,
    pub enterprise: usize,
}

impl ConcurrencyPolicy {
    /// The wave size for `account_type`.  Unknown tiers get the standard
    /// limit, and the result is never below 1.
    pub fn limit_for(&self, account_type: AccountType) -> usize {
        let limit = match account_type {
            AccountType::Enterprise => self.enterprise,
            AccountType::Standard | AccountType::Unknown => self.standard,
        };
        limit.max(1)
    }
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        Self {
            standard: 1,
            enterprise: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Config document
// ---------------------------------------------------------------------------

/// The persisted plugin configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginConfig {
    pub api_key: String,
    pub default_workflow_id: String,
    pub base_url: String,
    /// Delay between status polls, in milliseconds.
    #[serde(alias = "pollingIntervalMs")]
    pub polling_interval: u64,
    pub max_polling_attempts: u32,
    /// Expected upper bound for one run, in milliseconds.  Informational: the
    /// polling budget is the only enforced limit.
    #[serde(alias = "defaultTimeoutMs")]
    pub default_timeout: u64,
    pub cache_path: PathBuf,
    /// Pause between batch waves, in milliseconds.
    pub wave_delay_ms: u64,
    pub concurrency: ConcurrencyPolicy,
    pub request_timeout_secs: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            api_key: API_KEY_PLACEHOLDER.to_owned(),
            default_workflow_id: WORKFLOW_ID_PLACEHOLDER.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            polling_interval: 5_000,
            max_polling_attempts: 60,
            default_timeout: 300_000,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            wave_delay_ms: 1_000,
            concurrency: ConcurrencyPolicy::default(),
            request_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("api_key", &"<redacted>")
            .field("default_workflow_id", &self.default_workflow_id)
            .field("base_url", &self.base_url)
            .field("polling_interval", &self.polling_interval)
            .field("max_polling_attempts", &self.max_polling_attempts)
            .field("default_timeout", &self.default_timeout)
            .field("cache_path", &self.cache_path)
            .field("wave_delay_ms", &self.wave_delay_ms)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl PluginConfig {
    /// Load the config at `path`, writing and returning the defaults if the
    /// file does not exist.
    pub async fn load_or_init(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let config = serde_json::from_str(&content).map_err(|source| {
                    PluginError::ConfigParse {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save(path).await?;
                info!(
                    path = %path.display(),
                    "configuration file created with defaults; set your API key and workflow ID"
                );
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the whole document to `path` as pretty JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Check that the config can be used for remote calls.
    ///
    /// An empty base URL is replaced by the default one.
    pub fn validate(&mut self) -> Result<()> {
        let api_key = self.api_key.trim();
        if api_key.is_empty() || api_key == API_KEY_PLACEHOLDER {
            return Err(PluginError::Config(
                "please set your API key in the configuration file before using the integration"
                    .into(),
            ));
        }

        let workflow_id = self.default_workflow_id.trim();
        if workflow_id.is_empty() || workflow_id == WORKFLOW_ID_PLACEHOLDER {
            return Err(PluginError::Config(
                "please set your default workflow ID in the configuration file before using the integration"
                    .into(),
            ));
        }

        if self.base_url.trim().is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_owned();
        }
        let parsed = url::Url::parse(self.base_url.trim())
            .map_err(|e| PluginError::Config(format!("invalid baseUrl `{}`: {e}", self.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PluginError::Config(format!(
                "baseUrl must use http or https, got `{}`",
                parsed.scheme()
            )));
        }

        if self.polling_interval == 0 {
            return Err(PluginError::Config("pollingInterval must be greater than 0".into()));
        }
        if self.max_polling_attempts == 0 {
            return Err(PluginError::Config(
                "maxPollingAttempts must be greater than 0".into(),
            ));
        }

        let budget_ms = self.polling_interval.saturating_mul(u64::from(self.max_polling_attempts));
        if self.default_timeout > 0 && budget_ms > self.default_timeout {
            warn!(
                budget_ms,
                default_timeout = self.default_timeout,
                "polling budget exceeds defaultTimeout"
            );
        }

        Ok(())
    }

    /// Override credentials from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override credentials from `lookup`.  Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            debug!(var = ENV_API_KEY, "API key taken from environment");
            self.api_key = key;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            debug!(var = ENV_BASE_URL, url = %url, "base URL taken from environment");
            self.base_url = url;
        }
        if let Some(id) = get(ENV_WORKFLOW_ID) {
            debug!(var = ENV_WORKFLOW_ID, workflow_id = %id, "default workflow taken from environment");
            self.default_workflow_id = id;
        }
    }

    /// Merge `update` into this config and persist the result to `path`.
    ///
    /// Returns `true` when the API key or base URL changed, meaning any
    /// client built from the old values is stale.
    pub async fn update(&mut self, update: ConfigUpdate, path: &Path) -> Result<bool> {
        let credentials_changed = self.merge(update);
        self.save(path).await?;
        info!(path = %path.display(), credentials_changed, "configuration updated");
        Ok(credentials_changed)
    }

    fn merge(&mut self, update: ConfigUpdate) -> bool {
        let mut credentials_changed = false;

        if let Some(api_key) = update.api_key {
            credentials_changed |= api_key != self.api_key;
            self.api_key = api_key;
        }
        if let Some(base_url) = update.base_url {
            credentials_changed |= base_url != self.base_url;
            self.base_url = base_url;
        }
        if let Some(id) = update.default_workflow_id {
            self.default_workflow_id = id;
        }
        if let Some(ms) = update.polling_interval {
            self.polling_interval = ms;
        }
        if let Some(n) = update.max_polling_attempts {
            self.max_polling_attempts = n;
        }
        if let Some(ms) = update.default_timeout {
            self.default_timeout = ms;
        }
        if let Some(path) = update.cache_path {
            self.cache_path = path;
        }
        if let Some(ms) = update.wave_delay_ms {
            self.wave_delay_ms = ms;
        }
        if let Some(policy) = update.concurrency {
            self.concurrency = policy;
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }

        credentials_changed
    }

    /// A credential snapshot for the client.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.api_key.trim(), self.base_url.trim())
    }

    /// Default polling cadence.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.polling_interval),
            self.max_polling_attempts,
        )
    }

    pub fn wave_delay(&self) -> Duration {
        Duration::from_millis(self.wave_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// A partial configuration change.  Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub api_key: Option<String>,
    pub default_workflow_id: Option<String>,
    pub base_url: Option<String>,
    #[serde(alias = "pollingIntervalMs")]
    pub polling_interval: Option<u64>,
    pub max_polling_attempts: Option<u32>,
    #[serde(alias = "defaultTimeoutMs")]
    pub default_timeout: Option<u64>,
    pub cache_path: Option<PathBuf>,
    pub wave_delay_ms: Option<u64>,
    pub concurrency: Option<ConcurrencyPolicy>,
    pub request_timeout_secs: Option<u64>,
}
