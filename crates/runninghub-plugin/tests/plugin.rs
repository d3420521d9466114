//! End-to-end tests of the host plugin with an in-process service.

mod common;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use common::{FakeApi, InstantSleeper, descriptors};
use runninghub_api::{API_KEY_PLACEHOLDER, WorkflowApi};
use runninghub_plugin::{
    ApiFactory, ConfigUpdate, HostPlugin, PluginConfig, RunningHubPlugin,
};
use serde_json::json;
use tempfile::TempDir;

/// A plugin wired to `api`, recording the API key of every client built.
struct Harness {
    _dir: TempDir,
    config_path: PathBuf,
    cache_path: PathBuf,
    api: Arc<FakeApi>,
    built_with: Arc<Mutex<Vec<String>>>,
    built_timeouts: Arc<Mutex<Vec<u64>>>,
    sleeper: Arc<InstantSleeper>,
}

impl Harness {
    fn new(api: FakeApi) -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            config_path: dir.path().join("runninghub-config.json"),
            cache_path: dir.path().join("workflow-cache.json"),
            _dir: dir,
            api: Arc::new(api),
            built_with: Arc::new(Mutex::new(Vec::new())),
            built_timeouts: Arc::new(Mutex::new(Vec::new())),
            sleeper: Arc::new(InstantSleeper::default()),
        }
    }

    async fn write_config(&self, api_key: &str) {
        let config = PluginConfig {
            api_key: api_key.to_owned(),
            default_workflow_id: "wf-default".to_owned(),
            cache_path: self.cache_path.clone(),
            ..PluginConfig::default()
        };
        config.save(&self.config_path).await.unwrap();
    }

    fn plugin(&self) -> RunningHubPlugin {
        let api = Arc::clone(&self.api);
        let built_with = Arc::clone(&self.built_with);
        let built_timeouts = Arc::clone(&self.built_timeouts);
        let factory: ApiFactory = Arc::new(move |config: &PluginConfig| {
            built_with.lock().unwrap().push(config.api_key.clone());
            built_timeouts
                .lock()
                .unwrap()
                .push(config.request_timeout_secs);
            Arc::clone(&api) as Arc<dyn WorkflowApi>
        });

        RunningHubPlugin::new(&self.config_path)
            .with_api_factory(factory)
            .with_sleeper(Arc::clone(&self.sleeper) as Arc<dyn runninghub_api::Sleeper>)
            .without_env_overrides()
    }

    async fn ready_plugin(&self) -> RunningHubPlugin {
        self.write_config("key-1").await;
        let mut plugin = self.plugin();
        assert!(plugin.initialize().await);
        plugin
    }

    fn clients_built(&self) -> Vec<String> {
        self.built_with.lock().unwrap().clone()
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ═══════════════════════════════════════════════════════════════════════
//  Lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn first_start_writes_defaults_and_stays_not_ready() {
    let harness = Harness::new(FakeApi::new());
    let mut plugin = harness.plugin();

    assert!(!plugin.initialize().await);
    assert!(!plugin.is_ready());
    assert!(harness.clients_built().is_empty());

    let written = tokio::fs::read_to_string(&harness.config_path).await.unwrap();
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["apiKey"], API_KEY_PLACEHOLDER);
    assert_eq!(doc["pollingInterval"], 5000);
    assert_eq!(doc["maxPollingAttempts"], 60);

    let reply = plugin.process_command("runninghub-status", &[]).await;
    assert!(reply.starts_with("❌ RunningHub plugin not initialized"), "{reply}");

    let help = plugin.process_command("runninghub-help", &[]).await;
    assert!(help.contains("runninghub-execute"));
}

#[tokio::test]
async fn valid_config_makes_plugin_ready() {
    let harness = Harness::new(FakeApi::new());
    let plugin = harness.ready_plugin().await;

    assert!(plugin.is_ready());
    assert_eq!(harness.clients_built(), vec!["key-1"]);

    let info = plugin.info();
    assert_eq!(info.name, "runninghub");
    let names: Vec<&str> = info.commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "runninghub-status",
            "runninghub-list",
            "runninghub-execute",
            "runninghub-help"
        ]
    );
}

#[tokio::test]
async fn malformed_config_file_fails_initialization() {
    let harness = Harness::new(FakeApi::new());
    tokio::fs::write(&harness.config_path, "{ apiKey: ").await.unwrap();

    let mut plugin = harness.plugin();
    assert!(!plugin.initialize().await);
    assert!(plugin.try_initialize().await.is_err());
}

#[tokio::test]
async fn unknown_command_is_reported() {
    let harness = Harness::new(FakeApi::new());
    let plugin = harness.ready_plugin().await;

    let reply = plugin.process_command("runninghub-dance", &[]).await;
    assert!(reply.starts_with("Unknown command: runninghub-dance"), "{reply}");
}

// ═══════════════════════════════════════════════════════════════════════
//  Execute
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn execute_renders_task_and_outputs() {
    let harness = Harness::new(FakeApi::new().with_completed_payload(json!({
        "status": "completed",
        "outputs": [{"fileUrl": "https://cdn.example/out-1.png"}]
    })));
    let plugin = harness.ready_plugin().await;

    let reply = plugin
        .process_command(
            "runninghub-execute",
            &args(&[
                "42",
                r#"{"nodeInfoList": [{"nodeId": "6", "fieldName": "text", "fieldValue": "a cat"}]}"#,
            ]),
        )
        .await;

    assert!(reply.contains("Workflow ID: 42"), "{reply}");
    assert!(reply.contains("Task ID: task-1-42"), "{reply}");
    assert!(reply.contains("https://cdn.example/out-1.png"), "{reply}");

    let inputs = harness.api.submitted_inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].node_info_list.len(), 1);
    assert_eq!(inputs[0].node_info_list[0].field_name, "text");
}

#[tokio::test]
async fn execute_without_arguments_shows_usage() {
    let harness = Harness::new(FakeApi::new());
    let plugin = harness.ready_plugin().await;

    let reply = plugin.process_command("runninghub-execute", &[]).await;

    assert!(reply.starts_with("❌ Usage: runninghub-execute"), "{reply}");
    assert!(harness.api.submitted_workflows().is_empty());
}

#[tokio::test]
async fn execute_with_malformed_json_never_submits() {
    let harness = Harness::new(FakeApi::new());
    let plugin = harness.ready_plugin().await;

    let reply = plugin
        .process_command("runninghub-execute", &args(&["42", "{bad"]))
        .await;

    assert!(reply.starts_with("❌ Invalid JSON inputs"), "{reply}");
    assert!(harness.api.submitted_workflows().is_empty());
}

#[tokio::test]
async fn execute_failure_is_rendered() {
    let harness = Harness::new(FakeApi::new().failing("42"));
    let plugin = harness.ready_plugin().await;

    let reply = plugin
        .process_command("runninghub-execute", &args(&["42"]))
        .await;

    assert!(reply.starts_with("❌ Error executing workflow:"), "{reply}");
    assert!(reply.contains("workflow 42 crashed"), "{reply}");
}

#[tokio::test]
async fn default_workflow_runs_configured_id() {
    let harness = Harness::new(FakeApi::new());
    let plugin = harness.ready_plugin().await;

    plugin
        .execute_default_workflow(Default::default(), Default::default())
        .await
        .unwrap();

    assert_eq!(harness.api.submitted_workflows(), vec!["wf-default"]);
}

// ═══════════════════════════════════════════════════════════════════════
//  List and status
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn list_is_cached_until_refresh() {
    let harness = Harness::new(FakeApi::new().with_workflows(descriptors(12)));
    let plugin = harness.ready_plugin().await;

    let first = plugin.process_command("runninghub-list", &[]).await;
    assert!(first.starts_with("📋 Available workflows (12 total):"), "{first}");
    assert!(first.contains("... and 2 more workflows."), "{first}");
    assert!(!first.contains("ID: 11"), "{first}");
    assert_eq!(harness.api.list_calls(), 1);
    assert!(harness.cache_path.exists());

    plugin.process_command("runninghub-list", &[]).await;
    assert_eq!(harness.api.list_calls(), 1);

    plugin
        .process_command("runninghub-list", &args(&["--refresh"]))
        .await;
    assert_eq!(harness.api.list_calls(), 2);
}

#[tokio::test]
async fn empty_listing_is_rendered() {
    let harness = Harness::new(FakeApi::new());
    let plugin = harness.ready_plugin().await;

    let reply = plugin.process_command("runninghub-list", &[]).await;
    assert_eq!(reply, "📋 No workflows found.");
}

#[tokio::test]
async fn status_reports_account_and_balance() {
    let harness = Harness::new(FakeApi::new());
    let plugin = harness.ready_plugin().await;

    let reply = plugin.process_command("runninghub-status", &[]).await;

    assert!(reply.starts_with("✅ RunningHub connection: healthy"), "{reply}");
    assert!(reply.contains("acc-1"), "{reply}");
    assert!(reply.contains("88.50"), "{reply}");
}

#[tokio::test]
async fn status_reports_unhealthy_service() {
    let harness = Harness::new(FakeApi::new().with_failing_account());
    let plugin = harness.ready_plugin().await;

    let reply = plugin.process_command("runninghub-status", &[]).await;

    assert!(reply.starts_with("❌ RunningHub connection: unhealthy"), "{reply}");
    assert!(reply.contains("HTTP 500"), "{reply}");
}

// ═══════════════════════════════════════════════════════════════════════
//  Reconfiguration
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn new_api_key_rebuilds_client_and_persists() {
    let harness = Harness::new(FakeApi::new());
    let mut plugin = harness.ready_plugin().await;

    let ready = plugin
        .update_config(ConfigUpdate {
            api_key: Some("key-2".into()),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();

    assert!(ready);
    assert_eq!(harness.clients_built(), vec!["key-1", "key-2"]);

    let saved = PluginConfig::load_or_init(&harness.config_path).await.unwrap();
    assert_eq!(saved.api_key, "key-2");
    assert_eq!(saved.default_workflow_id, "wf-default");
}

#[tokio::test]
async fn non_credential_update_keeps_client() {
    let harness = Harness::new(FakeApi::new());
    let mut plugin = harness.ready_plugin().await;

    plugin
        .update_config(ConfigUpdate {
            polling_interval: Some(1_000),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();

    assert_eq!(harness.clients_built(), vec!["key-1"]);
    assert_eq!(plugin.config().unwrap().polling_interval, 1_000);
}

#[tokio::test]
async fn request_timeout_update_rebuilds_client() {
    let harness = Harness::new(FakeApi::new());
    let mut plugin = harness.ready_plugin().await;

    plugin
        .update_config(ConfigUpdate {
            request_timeout_secs: Some(90),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();

    assert_eq!(harness.clients_built(), vec!["key-1", "key-1"]);
    assert_eq!(*harness.built_timeouts.lock().unwrap(), vec![30, 90]);

    plugin
        .update_config(ConfigUpdate {
            request_timeout_secs: Some(90),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(harness.clients_built().len(), 2);
}

#[tokio::test]
async fn update_before_initialize_makes_plugin_ready() {
    let harness = Harness::new(FakeApi::new());
    let mut plugin = harness.plugin();

    let ready = plugin
        .update_config(ConfigUpdate {
            api_key: Some("fresh-key".into()),
            default_workflow_id: Some("77".into()),
            cache_path: Some(harness.cache_path.clone()),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();

    assert!(ready);
    assert!(plugin.is_ready());
    assert_eq!(harness.clients_built(), vec!["fresh-key"]);
}

#[tokio::test]
async fn incomplete_update_is_saved_but_not_ready() {
    let harness = Harness::new(FakeApi::new());
    let mut plugin = harness.plugin();

    let ready = plugin
        .update_config(ConfigUpdate {
            api_key: Some("fresh-key".into()),
            ..ConfigUpdate::default()
        })
        .await
        .unwrap();

    assert!(!ready);
    assert!(!plugin.is_ready());
    let saved = PluginConfig::load_or_init(&harness.config_path).await.unwrap();
    assert_eq!(saved.api_key, "fresh-key");
}
