//! Host plugin trait and registration metadata.
//!
//! A host application discovers a plugin's commands via
//! [`HostPlugin::info`] and dispatches textual commands through
//! [`HostPlugin::process_command`], which always answers with text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A command a plugin registers with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    /// Command name as typed by the user (e.g. `runninghub-status`).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Argument synopsis (e.g. `<workflowId> [inputs_json]`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub usage: String,
}

impl CommandDefinition {
    pub fn new(name: &str, description: &str, usage: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            usage: usage.to_owned(),
        }
    }
}

/// Registration metadata for a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub commands: Vec<CommandDefinition>,
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The interface a host application drives a plugin through.
#[async_trait]
pub trait HostPlugin: Send + Sync {
    /// Registration metadata: name, version, and commands.
    fn info(&self) -> PluginInfo;

    /// Prepare the plugin for use.  Returns `false` when the plugin cannot
    /// run (for example, missing credentials); the failure is logged.
    async fn initialize(&mut self) -> bool;

    /// Whether [`HostPlugin::initialize`] succeeded.
    fn is_ready(&self) -> bool;

    /// Run a command and render its outcome as text.  Never fails: errors
    /// are rendered into the returned message.
    async fn process_command(&self, command: &str, args: &[String]) -> String;
}
