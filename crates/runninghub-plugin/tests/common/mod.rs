//! In-process stand-ins for the RunningHub service and the timer.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use runninghub_api::{
    AccountInfo, AccountType, ApiError, BalanceInfo, Sleeper, TaskHandle, TaskState, TaskStatus,
    WorkflowApi, WorkflowDescriptor, WorkflowInputs,
};
use serde_json::{Map, Value, json};

/// Scriptable fake of the remote service.
///
/// Every submitted task replays `status_script` from the start, one entry
/// per status query; the last entry repeats.  Tasks of workflows listed in
/// `failing_tasks` report `failed` instead.
pub struct FakeApi {
    status_script: Vec<TaskState>,
    completed_payload: Value,
    rejected_workflows: HashSet<String>,
    failing_tasks: HashSet<String>,
    account_type: AccountType,
    fail_account: bool,
    fail_balance: bool,
    workflows: Vec<WorkflowDescriptor>,
    fail_listing: bool,

    submits: Mutex<Vec<(String, WorkflowInputs)>>,
    polls: Mutex<HashMap<String, usize>>,
    task_workflows: Mutex<HashMap<String, String>>,
    list_calls: AtomicUsize,
    account_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            status_script: vec![TaskState::Completed],
            completed_payload: json!({}),
            rejected_workflows: HashSet::new(),
            failing_tasks: HashSet::new(),
            account_type: AccountType::Standard,
            fail_account: false,
            fail_balance: false,
            workflows: Vec::new(),
            fail_listing: false,
            submits: Mutex::new(Vec::new()),
            polls: Mutex::new(HashMap::new()),
            task_workflows: Mutex::new(HashMap::new()),
            list_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(mut self, script: &[TaskState]) -> Self {
        self.status_script = script.to_vec();
        self
    }

    pub fn with_completed_payload(mut self, payload: Value) -> Self {
        self.completed_payload = payload;
        self
    }

    /// Submits of `workflow_id` fail with HTTP 500.
    pub fn rejecting(mut self, workflow_id: &str) -> Self {
        self.rejected_workflows.insert(workflow_id.to_owned());
        self
    }

    /// Tasks of `workflow_id` report a remote failure.
    pub fn failing(mut self, workflow_id: &str) -> Self {
        self.failing_tasks.insert(workflow_id.to_owned());
        self
    }

    pub fn with_account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    pub fn with_failing_account(mut self) -> Self {
        self.fail_account = true;
        self
    }

    pub fn with_failing_balance(mut self) -> Self {
        self.fail_balance = true;
        self
    }

    pub fn with_workflows(mut self, workflows: Vec<WorkflowDescriptor>) -> Self {
        self.workflows = workflows;
        self
    }

    pub fn with_failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn submitted_workflows(&self) -> Vec<String> {
        self.submits
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn submitted_inputs(&self) -> Vec<WorkflowInputs> {
        self.submits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, inputs)| inputs.clone())
            .collect()
    }

    pub fn total_polls(&self) -> usize {
        self.polls.lock().unwrap().values().sum()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn account_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn transport_error(operation: &str) -> ApiError {
        ApiError::Transport {
            operation: operation.to_owned(),
            status: Some(500),
            message: "Internal Server Error".to_owned(),
        }
    }
}

#[async_trait]
impl WorkflowApi for FakeApi {
    async fn submit_workflow(
        &self,
        workflow_id: &str,
        inputs: &WorkflowInputs,
    ) -> runninghub_api::Result<TaskHandle> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Let sibling submissions in the same wave start before this one ends.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let task_id = {
            let mut submits = self.submits.lock().unwrap();
            submits.push((workflow_id.to_owned(), inputs.clone()));
            format!("task-{}-{workflow_id}", submits.len())
        };

        if self.rejected_workflows.contains(workflow_id) {
            return Err(Self::transport_error("submit_workflow"));
        }

        self.task_workflows
            .lock()
            .unwrap()
            .insert(task_id.clone(), workflow_id.to_owned());
        Ok(TaskHandle {
            task_id: task_id.clone(),
            raw: json!({ "taskId": task_id }),
        })
    }

    async fn get_task_status(&self, task_id: &str) -> runninghub_api::Result<TaskStatus> {
        let poll_index = {
            let mut polls = self.polls.lock().unwrap();
            let count = polls.entry(task_id.to_owned()).or_insert(0);
            *count += 1;
            *count - 1
        };

        let workflow_id = self
            .task_workflows
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .unwrap_or_default();

        if self.failing_tasks.contains(&workflow_id) {
            return Ok(TaskStatus {
                task_id: task_id.to_owned(),
                state: TaskState::Failed,
                error: Some(format!("workflow {workflow_id} crashed")),
                payload: json!({"status": "failed"}),
            });
        }

        let state = self
            .status_script
            .get(poll_index)
            .or_else(|| self.status_script.last())
            .copied()
            .unwrap_or(TaskState::Completed);
        let payload = if state == TaskState::Completed {
            self.completed_payload.clone()
        } else {
            json!({ "status": state.to_string() })
        };

        Ok(TaskStatus {
            task_id: task_id.to_owned(),
            state,
            error: None,
            payload,
        })
    }

    async fn get_account_info(&self) -> runninghub_api::Result<AccountInfo> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_account {
            return Err(Self::transport_error("get_account_info"));
        }
        Ok(AccountInfo {
            account_id: "acc-1".to_owned(),
            account_type: self.account_type,
            extra: Map::new(),
        })
    }

    async fn get_balance(&self) -> runninghub_api::Result<BalanceInfo> {
        if self.fail_balance {
            return Err(Self::transport_error("get_balance"));
        }
        Ok(BalanceInfo {
            available: Some(88.5),
            extra: Map::new(),
        })
    }

    async fn list_workflows(&self) -> runninghub_api::Result<Vec<WorkflowDescriptor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(Self::transport_error("list_workflows"));
        }
        Ok(self.workflows.clone())
    }
}

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct InstantSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.sleeps().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn descriptors(count: usize) -> Vec<WorkflowDescriptor> {
    (1..=count)
        .map(|i| WorkflowDescriptor::new(i.to_string(), format!("workflow {i}")))
        .collect()
}
