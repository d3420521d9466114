//! Wire and domain types for the RunningHub API.
//!
//! Response types are deliberately tolerant: unknown fields are kept in a
//! flattened `extra` map, identifiers may arrive as strings or numbers, and
//! only the fields the client acts on are required.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Placeholder written into a fresh config for the API key.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Placeholder written into a fresh config for the default workflow.
pub const WORKFLOW_ID_PLACEHOLDER: &str = "YOUR_WORKFLOW_ID_HERE";

/// Default RunningHub base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.runninghub.cn";

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Immutable credential snapshot used by the client.
///
/// The client never patches a snapshot in place; a configuration change
/// produces a new value that replaces the old one wholesale.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    base_url: String,
}

impl Credentials {
    /// Create a credential snapshot.  A trailing `/` on the base URL is
    /// dropped so paths can be appended verbatim.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the API key is usable for a remote call.
    pub fn has_api_key(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Workflow inputs
// ---------------------------------------------------------------------------

/// A single node-targeted field override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub node_id: String,
    pub field_name: String,
    pub field_value: Value,
}

impl NodeInfo {
    pub fn new(
        node_id: impl Into<String>,
        field_name: impl Into<String>,
        field_value: impl Into<Value>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            field_name: field_name.into(),
            field_value: field_value.into(),
        }
    }
}

/// Inputs for one workflow run.
///
/// Only `nodeInfoList` and the three run flags are sent to the service; any
/// other keys are kept so callers can round-trip the document they passed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInputs {
    #[serde(default)]
    pub node_info_list: Vec<NodeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_personal_queue: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowInputs {
    /// Append a node override, builder style.
    pub fn with_node(mut self, node: NodeInfo) -> Self {
        self.node_info_list.push(node);
        self
    }
}

/// Request body for `POST /openapi/v2/run/workflow/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitRequest<'a> {
    pub add_metadata: bool,
    pub node_info_list: &'a [NodeInfo],
    pub instance_type: &'a str,
    pub use_personal_queue: bool,
    pub webhook_url: &'a str,
}

impl<'a> SubmitRequest<'a> {
    pub(crate) fn from_inputs(inputs: &'a WorkflowInputs) -> Self {
        Self {
            add_metadata: false,
            node_info_list: &inputs.node_info_list,
            instance_type: inputs.instance_type.as_deref().unwrap_or("default"),
            use_personal_queue: inputs.use_personal_queue.unwrap_or(false),
            webhook_url: inputs.webhook_url.as_deref().unwrap_or(""),
        }
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Optional per-call overrides of the polling cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingOptions {
    #[serde(default, alias = "pollingIntervalMs", skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_polling_attempts: Option<u32>,
}

/// Resolved polling cadence: a fixed interval and an attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Apply per-call overrides on top of this policy.  Zero values in the
    /// overrides are ignored.
    pub fn with_overrides(self, options: &PollingOptions) -> Self {
        Self {
            interval: options
                .polling_interval
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(self.interval),
            max_attempts: options
                .max_polling_attempts
                .filter(|n| *n > 0)
                .unwrap_or(self.max_attempts),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 60)
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Identifier returned by a submit call.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskHandle {
    pub task_id: String,
    /// The full submit response.
    pub raw: Value,
}

/// Lifecycle state reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Error,
    /// Any state string this client does not know; treated as non-terminal.
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// Parse a state string, case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => Self::Pending,
            "running" => Self::Running,
            "completed" | "success" => Self::Completed,
            "failed" => Self::Failed,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Error)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Error => write!(f, "error"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One observation of a task's status.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub task_id: String,
    pub state: TaskState,
    /// Remote error details, present on failed tasks.
    pub error: Option<String>,
    /// The full status response.
    pub payload: Value,
}

impl TaskStatus {
    /// Remote error code, when the service supplies one.
    pub fn error_code(&self) -> Option<String> {
        self.payload.get("errorCode").and_then(scalar_to_string)
    }

    /// Remote error message, falling back to [`TaskStatus::error`].
    pub fn error_message(&self) -> Option<String> {
        self.payload
            .get("errorMessage")
            .and_then(scalar_to_string)
            .or_else(|| self.error.clone())
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Account tier as reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Standard,
    Enterprise,
    #[serde(other)]
    Unknown,
}

impl AccountType {
    /// Map a tier name to a variant, case-insensitively.  Anything else is
    /// [`AccountType::Unknown`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Self::Standard,
            "enterprise" => Self::Enterprise,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Enterprise => write!(f, "enterprise"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Response of `GET /api/v1/account/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default, deserialize_with = "string_or_number")]
    pub account_id: String,
    #[serde(default, deserialize_with = "lenient_account_type")]
    pub account_type: AccountType,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /api/v1/account/balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub available: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Workflow listing
// ---------------------------------------------------------------------------

/// One entry of the workflow listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDescriptor {
    #[serde(
        default,
        alias = "workflowId",
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        alias = "title",
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Render a JSON scalar as a string; `None` for null, arrays and objects.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string_or_number(deserializer)?.unwrap_or_default())
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

fn lenient_account_type<'de, D>(deserializer: D) -> Result<AccountType, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => AccountType::parse(&s),
        _ => AccountType::Unknown,
    })
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
