//! HTTP implementation of [`WorkflowApi`] for the RunningHub service.
//!
//! Workflow runs go through the v2 OpenAPI endpoints; account and listing
//! calls use the v1 API.  Responses may be bare JSON or wrapped in the
//! service's `{code, msg, data}` envelope; both shapes are accepted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::polling::poll_until_terminal;
use crate::traits::{TokioSleeper, WorkflowApi};
use crate::types::{
    AccountInfo, BalanceInfo, Credentials, PollPolicy, SubmitRequest, TaskHandle, TaskState,
    TaskStatus, WorkflowDescriptor, WorkflowInputs, scalar_to_string,
};

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Keys under which list endpoints may nest their array.
const LIST_KEYS: [&str; 4] = ["workflows", "list", "records", "data"];

/// RunningHub HTTP client.
///
/// Holds an immutable [`Credentials`] snapshot.  Use
/// [`RunningHubClient::with_credentials`] to obtain a client for new
/// credentials; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct RunningHubClient {
    credentials: Arc<Credentials>,
    http: reqwest::Client,
}

impl RunningHubClient {
    /// Create a client with the default request timeout.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_timeout(credentials, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("runninghub-plugin/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            credentials: Arc::new(credentials),
            http,
        }
    }

    /// A client for `credentials` that reuses this client's connection pool.
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
            http: self.http.clone(),
        }
    }

    /// The credential snapshot this client uses.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Poll a task with the tokio timer.  See [`poll_until_terminal`].
    pub async fn poll_until_terminal(&self, task_id: &str, policy: PollPolicy) -> Result<TaskStatus> {
        poll_until_terminal(self, &TokioSleeper, task_id, policy).await
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    /// The credentials, or a [`ApiError::Config`] error when they are unusable.
    fn usable_credentials(&self) -> Result<&Credentials> {
        if !self.credentials.has_api_key() {
            return Err(ApiError::Config(
                "RunningHub API key is not set; update the configuration before making requests"
                    .into(),
            ));
        }
        if self.credentials.base_url().is_empty() {
            return Err(ApiError::Config("RunningHub base URL is not set".into()));
        }
        Ok(&self.credentials)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.credentials.base_url(), path)
    }

    fn get_request(&self, path: &str) -> Result<reqwest::RequestBuilder> {
        let creds = self.usable_credentials()?;
        Ok(self
            .http
            .get(self.api_url(path))
            .header("Authorization", format!("Bearer {}", creds.api_key()))
            .header("Content-Type", "application/json"))
    }

    fn post_request(&self, path: &str) -> Result<reqwest::RequestBuilder> {
        let creds = self.usable_credentials()?;
        Ok(self
            .http
            .post(self.api_url(path))
            .header("Authorization", format!("Bearer {}", creds.api_key()))
            .header("Content-Type", "application/json"))
    }

    /// Send a request and return the JSON body with any envelope removed.
    async fn send_request(&self, request: reqwest::RequestBuilder, operation: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(operation, &e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| ApiError::network(operation, &e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body_text)
                .ok()
                .and_then(|body| envelope_message(&body))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request rejected")
                        .to_owned()
                });
            warn!(operation, status = status.as_u16(), "RunningHub request rejected");
            return Err(ApiError::Transport {
                operation: operation.to_owned(),
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: Value = serde_json::from_str(&body_text).map_err(|e| {
            ApiError::protocol(operation, format!("response is not valid JSON: {e}"))
        })?;
        unwrap_envelope(body, operation)
    }
}

#[async_trait]
impl WorkflowApi for RunningHubClient {
    async fn submit_workflow(
        &self,
        workflow_id: &str,
        inputs: &WorkflowInputs,
    ) -> Result<TaskHandle> {
        let request = self
            .post_request(&format!("/openapi/v2/run/workflow/{workflow_id}"))?
            .json(&SubmitRequest::from_inputs(inputs));

        debug!(workflow_id, nodes = inputs.node_info_list.len(), "submitting workflow");
        let body = self.send_request(request, "submit_workflow").await?;
        let handle = parse_task_handle(body)?;
        info!(workflow_id, task_id = %handle.task_id, "workflow submitted");
        Ok(handle)
    }

    async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let request = self
            .post_request("/openapi/v2/query")?
            .json(&json!({ "taskId": task_id }));
        let body = self.send_request(request, "get_task_status").await?;
        parse_task_status(task_id, body)
    }

    async fn get_account_info(&self) -> Result<AccountInfo> {
        let request = self.get_request("/api/v1/account/info")?;
        let body = self.send_request(request, "get_account_info").await?;
        serde_json::from_value(body)
            .map_err(|e| ApiError::protocol("get_account_info", e.to_string()))
    }

    async fn get_balance(&self) -> Result<BalanceInfo> {
        let request = self.get_request("/api/v1/account/balance")?;
        let body = self.send_request(request, "get_balance").await?;
        serde_json::from_value(body).map_err(|e| ApiError::protocol("get_balance", e.to_string()))
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowDescriptor>> {
        let request = self.get_request("/api/v1/workflow/list")?;
        let body = self.send_request(request, "list_workflows").await?;
        let workflows = parse_workflow_list(body)?;
        debug!(count = workflows.len(), "listed workflows");
        Ok(workflows)
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Strip the `{code, msg, data}` envelope.  A non-zero `code` is a remote
/// rejection delivered with a success status.
fn unwrap_envelope(body: Value, operation: &str) -> Result<Value> {
    let Value::Object(mut map) = body else {
        return Ok(body);
    };
    let Some(code) = map.get("code").cloned() else {
        return Ok(Value::Object(map));
    };

    let ok = match &code {
        Value::Number(n) => n.as_i64() == Some(0),
        Value::String(s) => s == "0",
        _ => false,
    };
    if !ok {
        let message = envelope_message(&Value::Object(map.clone()))
            .unwrap_or_else(|| "no message".to_owned());
        return Err(ApiError::protocol(
            operation,
            format!("service returned code {code}: {message}"),
        ));
    }

    Ok(match map.remove("data") {
        Some(data) if !data.is_null() => data,
        _ => Value::Object(map),
    })
}

fn envelope_message(body: &Value) -> Option<String> {
    ["msg", "message", "errorMessage", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(scalar_to_string))
}

pub(crate) fn parse_task_handle(body: Value) -> Result<TaskHandle> {
    let task_id = body
        .get("taskId")
        .and_then(scalar_to_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            ApiError::protocol("submit_workflow", "response does not contain a `taskId`")
        })?;
    Ok(TaskHandle { task_id, raw: body })
}

pub(crate) fn parse_task_status(task_id: &str, body: Value) -> Result<TaskStatus> {
    let state = body
        .get("status")
        .and_then(Value::as_str)
        .map(TaskState::parse)
        .ok_or_else(|| {
            ApiError::protocol("get_task_status", "response does not contain a `status`")
        })?;

    let error = match body.get("error") {
        Some(Value::Null) | None => body.get("errorMessage").and_then(scalar_to_string),
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
    .filter(|s| !s.is_empty());

    Ok(TaskStatus {
        task_id: task_id.to_owned(),
        state,
        error,
        payload: body,
    })
}

pub(crate) fn parse_workflow_list(body: Value) -> Result<Vec<WorkflowDescriptor>> {
    let mut current = body;
    // Allow up to two levels of nesting, e.g. `{data: {records: [...]}}`.
    for _ in 0..3 {
        if current.is_array() {
            return serde_json::from_value(current)
                .map_err(|e| ApiError::protocol("list_workflows", e.to_string()));
        }
        let Value::Object(mut map) = current else {
            break;
        };
        let Some(inner) = LIST_KEYS.iter().find_map(|key| map.remove(*key)) else {
            break;
        };
        current = inner;
    }
    Err(ApiError::protocol(
        "list_workflows",
        "response does not contain a workflow array",
    ))
}
