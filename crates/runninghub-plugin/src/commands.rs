//! Command surface: argument parsing and text rendering.
//!
//! Everything here is pure; [`RunningHubPlugin`](crate::RunningHubPlugin)
//! wires it to the orchestrator and cache.

use std::fmt::Write as _;
use std::time::Duration;

use runninghub_api::{TaskStatus, WorkflowDescriptor, WorkflowInputs};

use crate::orchestrator::{AccountSnapshot, HealthReport};
use crate::traits::CommandDefinition;

/// Maximum number of workflows rendered by the list command.
pub const LIST_DISPLAY_LIMIT: usize = 10;

/// Prefix of every error message returned to the host.
pub const ERROR_PREFIX: &str = "❌";

pub const STATUS_COMMAND: &str = "runninghub-status";
pub const LIST_COMMAND: &str = "runninghub-list";
pub const EXECUTE_COMMAND: &str = "runninghub-execute";
pub const HELP_COMMAND: &str = "runninghub-help";

const EXECUTE_USAGE: &str = "<workflowId> [inputs_json]";
const EXAMPLE_INPUTS: &str =
    r#"'{"nodeInfoList": [{"nodeId": "10", "fieldName": "text", "fieldValue": "a cat"}]}'"#;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A recognised host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    List,
    Execute,
    Help,
}

impl Command {
    /// Resolve a command name.  Accepts the `runninghub-` prefixed names and
    /// the bare ones, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let bare = lower.strip_prefix("runninghub-").unwrap_or(&lower);
        match bare {
            "status" => Some(Self::Status),
            "list" => Some(Self::List),
            "execute" => Some(Self::Execute),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Arguments of the execute command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    pub workflow_id: String,
    pub inputs: WorkflowInputs,
}

/// Parse `<workflowId> [inputs_json...]`.  The JSON may be split across
/// several arguments; they are joined with spaces.
///
/// On failure, returns the message to show the user.
pub fn parse_execute_args(args: &[String]) -> Result<ExecuteRequest, String> {
    let Some((workflow_id, rest)) = args.split_first() else {
        return Err(execute_usage());
    };
    if workflow_id.trim().is_empty() {
        return Err(execute_usage());
    }

    let raw = rest.join(" ");
    let inputs = if raw.trim().is_empty() {
        WorkflowInputs::default()
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| format!("{ERROR_PREFIX} Invalid JSON inputs: {e}"))?
    };

    Ok(ExecuteRequest {
        workflow_id: workflow_id.trim().to_owned(),
        inputs,
    })
}

/// Whether the list command asked for a forced refresh.
pub fn wants_refresh(args: &[String]) -> bool {
    args.iter().any(|a| a == "--refresh" || a == "-r")
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Commands registered with the host.
pub fn command_definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(STATUS_COMMAND, "Check RunningHub connection status", ""),
        CommandDefinition::new(LIST_COMMAND, "List available workflows", "[--refresh]"),
        CommandDefinition::new(
            EXECUTE_COMMAND,
            "Execute a workflow with the given inputs",
            EXECUTE_USAGE,
        ),
        CommandDefinition::new(HELP_COMMAND, "Show RunningHub plugin help", ""),
    ]
}

pub fn not_ready_message() -> String {
    format!("{ERROR_PREFIX} RunningHub plugin not initialized. Please check configuration.")
}

pub fn unknown_command_message(command: &str) -> String {
    format!("Unknown command: {command}. Use '{HELP_COMMAND}' for available commands.")
}

/// Render an error raised while running `action`.
pub fn error_message(action: &str, err: &dyn std::error::Error) -> String {
    format!("{ERROR_PREFIX} Error {action}: {err}")
}

fn execute_usage() -> String {
    format!(
        "{ERROR_PREFIX} Usage: {EXECUTE_COMMAND} {EXECUTE_USAGE}\nExample: {EXECUTE_COMMAND} 123456789 {EXAMPLE_INPUTS}"
    )
}

pub fn help_text() -> String {
    let mut out = String::from("🤖 RunningHub plugin commands:\n\n");
    for cmd in command_definitions() {
        let synopsis = if cmd.usage.is_empty() {
            cmd.name.clone()
        } else {
            format!("{} {}", cmd.name, cmd.usage)
        };
        let _ = writeln!(out, "• `{synopsis}` - {}", cmd.description);
    }
    let _ = write!(
        out,
        "\nExamples:\n  {EXECUTE_COMMAND} 123456789\n  {EXECUTE_COMMAND} 123456789 {EXAMPLE_INPUTS}\n  {LIST_COMMAND} --refresh"
    );
    out
}

/// Render a healthy probe together with the account snapshot.
pub fn format_status(health: &HealthReport, snapshot: &AccountSnapshot) -> String {
    let balance = snapshot
        .balance
        .available
        .map(|amount| format!("{amount:.2}"))
        .unwrap_or_else(|| "N/A".to_owned());
    let account_id = if snapshot.account.account_id.is_empty() {
        "unknown"
    } else {
        snapshot.account.account_id.as_str()
    };

    format!(
        "✅ RunningHub connection: {}\n👤 Account: {account_id} ({})\n💰 Balance: {balance}\n🕒 Checked at: {}",
        health.status,
        snapshot.account.account_type,
        health.checked_at.to_rfc3339(),
    )
}

/// Render a failed probe.
pub fn format_unhealthy(health: &HealthReport) -> String {
    format!(
        "{ERROR_PREFIX} RunningHub connection: {}\nError: {}",
        health.status,
        health.error.as_deref().unwrap_or("unknown error"),
    )
}

/// Render a finished execution.
pub fn format_execution(workflow_id: &str, elapsed: Duration, status: &TaskStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🚀 Workflow finished");
    let _ = writeln!(out, "🆔 Workflow ID: {workflow_id}");
    let _ = writeln!(out, "⏱️ Took: {:.2}s", elapsed.as_secs_f64());
    let _ = writeln!(out, "🏷️ Task ID: {}", status.task_id);
    let _ = writeln!(out, "📊 Status: {}", status.state);

    if let Some(code) = status.error_code() {
        let _ = writeln!(out, "⚠️ Error code: {code}");
        let _ = writeln!(
            out,
            "📝 Error message: {}",
            status.error_message().unwrap_or_default()
        );
    }

    let outputs = output_urls(status);
    if !outputs.is_empty() {
        let _ = writeln!(out, "📦 Outputs:");
        for url in outputs {
            let _ = writeln!(out, "  {url}");
        }
    }
    out
}

/// File URLs found in a completed task's `outputs`/`results` array.
fn output_urls(status: &TaskStatus) -> Vec<String> {
    ["outputs", "results"]
        .iter()
        .filter_map(|key| status.payload.get(*key).and_then(|v| v.as_array()))
        .flatten()
        .filter_map(|item| {
            item.get("fileUrl")
                .or_else(|| item.get("url"))
                .and_then(|u| u.as_str())
                .map(str::to_owned)
        })
        .collect()
}

/// Render a workflow listing, showing at most [`LIST_DISPLAY_LIMIT`] entries.
pub fn format_workflow_list(workflows: &[WorkflowDescriptor]) -> String {
    if workflows.is_empty() {
        return "📋 No workflows found.".to_owned();
    }

    let mut out = format!("📋 Available workflows ({} total):\n\n", workflows.len());
    for wf in workflows.iter().take(LIST_DISPLAY_LIMIT) {
        let _ = writeln!(out, "• ID: {}", wf.id.as_deref().unwrap_or("N/A"));
        let _ = writeln!(out, "  Name: {}", wf.name.as_deref().unwrap_or("Untitled"));
        let _ = writeln!(
            out,
            "  Description: {}\n",
            wf.description.as_deref().unwrap_or("No description")
        );
    }
    if workflows.len() > LIST_DISPLAY_LIMIT {
        let _ = write!(
            out,
            "... and {} more workflows.",
            workflows.len() - LIST_DISPLAY_LIMIT
        );
    }
    out
}
