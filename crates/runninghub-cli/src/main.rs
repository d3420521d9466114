//! CLI entry point for the RunningHub plugin.
//!
//! The `runninghub` binary drives the same command surface a host
//! application sees, plus batch runs and configuration edits.

mod helpers;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use runninghub_plugin::commands::{EXECUTE_COMMAND, HELP_COMMAND, LIST_COMMAND, STATUS_COMMAND};
use runninghub_plugin::config::DEFAULT_CONFIG_PATH;
use runninghub_plugin::{ConfigUpdate, HostPlugin, RunningHubPlugin, WorkflowSpec};
use tracing::{info, warn};

use crate::helpers::{init_tracing, render_batch};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Run RunningHub cloud workflows from the command line.
#[derive(Parser)]
#[command(
    name = "runninghub",
    version,
    about = "Run RunningHub cloud workflows",
    disable_help_subcommand = true
)]
struct Cli {
    /// Path of the JSON configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the connection, account and balance.
    Status,

    /// List available workflows.
    List {
        /// Bypass the one-hour listing cache.
        #[arg(long, short)]
        refresh: bool,
    },

    /// Execute a workflow and wait for it to finish.
    Execute {
        workflow_id: String,
        /// Inputs as JSON, e.g. '{"nodeInfoList": [...]}'.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        inputs: Vec<String>,
    },

    /// Run a JSON array of workflow specs with the account's concurrency.
    Batch { file: PathBuf },

    /// Edit the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print plugin registration metadata as JSON.
    Info,

    /// Show plugin command help.
    Help,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Change one or more settings and save them.
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        workflow_id: Option<String>,
        #[arg(long)]
        polling_interval_ms: Option<u64>,
        #[arg(long)]
        max_polling_attempts: Option<u32>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Status => cmd_plugin(&cli.config, STATUS_COMMAND, Vec::new()).await,
        Commands::List { refresh } => {
            let args = if refresh {
                vec!["--refresh".to_owned()]
            } else {
                Vec::new()
            };
            cmd_plugin(&cli.config, LIST_COMMAND, args).await
        }
        Commands::Execute {
            workflow_id,
            inputs,
        } => {
            let mut args = vec![workflow_id];
            args.extend(inputs);
            cmd_plugin(&cli.config, EXECUTE_COMMAND, args).await
        }
        Commands::Batch { file } => cmd_batch(&cli.config, &file).await,
        Commands::Config { action } => cmd_config(&cli.config, action).await,
        Commands::Info => cmd_info(&cli.config),
        Commands::Help => {
            let plugin = RunningHubPlugin::new(&cli.config);
            println!("{}", plugin.process_command(HELP_COMMAND, &[]).await);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

/// Initialise the plugin and forward one host command to it.
async fn cmd_plugin(config: &Path, command: &str, args: Vec<String>) -> Result<()> {
    let mut plugin = RunningHubPlugin::new(config);
    if !plugin.initialize().await {
        warn!(config = %config.display(), "plugin not ready; edit the config or run `runninghub config set`");
    }
    println!("{}", plugin.process_command(command, &args).await);
    Ok(())
}

async fn cmd_batch(config: &Path, file: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read batch file {}", file.display()))?;
    let specs: Vec<WorkflowSpec> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse batch file {}", file.display()))?;

    let mut plugin = RunningHubPlugin::new(config);
    plugin
        .try_initialize()
        .await
        .context("failed to initialize RunningHub plugin")?;

    info!(count = specs.len(), "running batch");
    let outcomes = plugin
        .execute_batch(&specs)
        .await
        .context("failed to start batch")?;
    println!("{}", render_batch(&outcomes));
    Ok(())
}

async fn cmd_config(config: &Path, action: ConfigAction) -> Result<()> {
    let ConfigAction::Set {
        api_key,
        base_url,
        workflow_id,
        polling_interval_ms,
        max_polling_attempts,
    } = action;

    let update = ConfigUpdate {
        api_key,
        base_url,
        default_workflow_id: workflow_id,
        polling_interval: polling_interval_ms,
        max_polling_attempts,
        ..ConfigUpdate::default()
    };
    if update == ConfigUpdate::default() {
        bail!("nothing to change; pass at least one setting");
    }

    let mut plugin = RunningHubPlugin::new(config);
    let ready = plugin
        .update_config(update)
        .await
        .with_context(|| format!("failed to update {}", config.display()))?;

    if ready {
        println!("✅ Configuration saved to {}", config.display());
    } else {
        println!(
            "⚠️ Configuration saved to {}, but it is still incomplete",
            config.display()
        );
    }
    Ok(())
}

fn cmd_info(config: &Path) -> Result<()> {
    let plugin = RunningHubPlugin::new(config);
    let json = serde_json::to_string_pretty(&plugin.info()).context("failed to render info")?;
    println!("{json}");
    Ok(())
}
