//! Client error types.
//!
//! Every remote call surfaces failures through [`ApiError`].  The variants
//! separate local misconfiguration, transport failures, malformed responses
//! and remote task outcomes so callers can decide how to report them without
//! inspecting opaque strings.

/// Unified error type for the RunningHub API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Credentials are missing, still placeholders, or the client has not
    /// been set up.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP exchange failed: a non-success status, or no response at all
    /// (`status` is `None` for connect, timeout and body-read failures).
    #[error("{operation} failed: {}", transport_detail(.status, .message))]
    Transport {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// A well-formed response is missing a field the client requires.
    #[error("unexpected response from {operation}: {reason}")]
    Protocol { operation: String, reason: String },

    /// The remote service reported a terminal failure for the task.
    #[error("task `{task_id}` failed: {message}")]
    TaskFailed { task_id: String, message: String },

    /// The task did not reach a terminal state within the attempt budget.
    #[error("task `{task_id}` did not complete within {attempts} attempts")]
    PollingTimeout { task_id: String, attempts: u32 },
}

fn transport_detail(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}: {message}"),
        None => message.to_owned(),
    }
}

impl ApiError {
    /// Build a [`ApiError::Transport`] for a request that never produced a
    /// usable response.
    pub(crate) fn network(operation: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            format!("request failed: {err}")
        };
        Self::Transport {
            operation: operation.to_owned(),
            status: None,
            message,
        }
    }

    /// Build a [`ApiError::Protocol`] error.
    pub(crate) fn protocol(operation: &str, reason: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.to_owned(),
            reason: reason.into(),
        }
    }

    /// The HTTP status attached to a transport failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Convenience alias used throughout the client crate.
pub type Result<T> = std::result::Result<T, ApiError>;
