#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use stackctl_core::{
    ApiError, AttachPrefill, AttachRequest, BackupApi, BackupObserver, BackupStatus, Checkpoint,
    CheckpointStatus, Config, ConfirmPrompt, PollerConfig, Prompter, ReminderChoice,
    RestoreRequest, ScheduleRequest, TaskKind, TaskResult, TaskStatusReport, WireStatus,
};

/// Shared, ordered record of what happened, across fake and prompter.
pub type Log = Arc<Mutex<Vec<String>>>;

/// One scripted answer from the task-status endpoint.
#[derive(Debug, Clone)]
pub enum Poll {
    Pending,
    Running,
    Succeeded(Option<TaskResult>),
    Failed(String),
    Timeout,
    NotFound,
    Unauthorized,
}

struct FakeState {
    status: BackupStatus,
    checkpoints: Vec<Checkpoint>,
    fail_refresh: bool,
    fail_submit: bool,
    scripts: HashMap<String, VecDeque<Poll>>,
    submitted: HashMap<TaskKind, usize>,
    last_restore: Option<RestoreRequest>,
    last_attach: Option<AttachRequest>,
    last_schedule: Option<ScheduleRequest>,
    archive: Vec<u8>,
}

/// In-memory backup API with scripted task progress.
///
/// Task ids are `snapshot-N`, `restore-N` and `attach-N`. A task script
/// keeps repeating its last entry once the others are consumed; unknown
/// tasks stay `Running`.
pub struct FakeApi {
    state: Mutex<FakeState>,
    pub log: Log,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                status: sample_status(),
                checkpoints: vec![
                    checkpoint("cp-41", 1),
                    checkpoint("cp-42", 2),
                ],
                fail_refresh: false,
                fail_submit: false,
                scripts: HashMap::new(),
                submitted: HashMap::new(),
                last_restore: None,
                last_attach: None,
                last_schedule: None,
                archive: b"pv-pvc-archive".to_vec(),
            }),
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn script(&self, task_id: &str, polls: Vec<Poll>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(task_id.to_string(), polls.into());
    }

    pub fn set_checkpoints(&self, checkpoints: Vec<Checkpoint>) {
        self.state.lock().unwrap().checkpoints = checkpoints;
    }

    pub fn set_protected(&self, protected: bool) {
        self.state.lock().unwrap().status.is_protected = protected;
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.state.lock().unwrap().fail_refresh = fail;
    }

    pub fn fail_submit(&self, fail: bool) {
        self.state.lock().unwrap().fail_submit = fail;
    }

    pub fn last_attach(&self) -> Option<AttachRequest> {
        self.state.lock().unwrap().last_attach.clone()
    }

    pub fn last_restore(&self) -> Option<RestoreRequest> {
        self.state.lock().unwrap().last_restore.clone()
    }

    pub fn last_schedule(&self) -> Option<ScheduleRequest> {
        self.state.lock().unwrap().last_schedule.clone()
    }

    /// Number of logged calls whose entry starts with `prefix`.
    pub fn calls(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn submit(&self, kind: TaskKind, name: &str) -> Result<String, ApiError> {
        self.record(format!("submit:{name}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_submit {
            return Err(ApiError::Status {
                status: 500,
                message: "backend unavailable".into(),
            });
        }
        let n = state.submitted.entry(kind).or_insert(0);
        *n += 1;
        Ok(format!("{name}-{n}"))
    }
}

#[async_trait]
impl BackupApi for FakeApi {
    async fn backup_status(&self, _stack_id: &str) -> Result<BackupStatus, ApiError> {
        self.record("status");
        let state = self.state.lock().unwrap();
        if state.fail_refresh {
            return Err(ApiError::Network("connection refused".into()));
        }
        Ok(state.status.clone())
    }

    async fn list_checkpoints(
        &self,
        _stack_id: &str,
        limit: usize,
    ) -> Result<Vec<Checkpoint>, ApiError> {
        self.record("checkpoints");
        let state = self.state.lock().unwrap();
        if state.fail_refresh {
            return Err(ApiError::Network("connection refused".into()));
        }
        Ok(state.checkpoints.iter().take(limit).cloned().collect())
    }

    async fn create_snapshot(&self, _stack_id: &str) -> Result<String, ApiError> {
        self.submit(TaskKind::Snapshot, "snapshot")
    }

    async fn restore(&self, _stack_id: &str, request: &RestoreRequest) -> Result<String, ApiError> {
        let id = self.submit(TaskKind::Restore, "restore")?;
        self.state.lock().unwrap().last_restore = Some(request.clone());
        Ok(id)
    }

    async fn configure_schedule(
        &self,
        _stack_id: &str,
        request: &ScheduleRequest,
    ) -> Result<(), ApiError> {
        self.record("configure");
        self.state.lock().unwrap().last_schedule = Some(request.clone());
        Ok(())
    }

    async fn attach(&self, _stack_id: &str, request: &AttachRequest) -> Result<String, ApiError> {
        let id = self.submit(TaskKind::Attach, "attach")?;
        self.state.lock().unwrap().last_attach = Some(request.clone());
        Ok(id)
    }

    async fn export_pv_pvc(&self, _stack_id: &str) -> Result<Vec<u8>, ApiError> {
        self.record("export");
        Ok(self.state.lock().unwrap().archive.clone())
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport, ApiError> {
        self.record(format!("poll:{task_id}"));
        let mut state = self.state.lock().unwrap();
        let poll = match state.scripts.get_mut(task_id) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap_or(Poll::Running),
            None => Poll::Running,
        };

        let report = |status, result, error| TaskStatusReport {
            status,
            result,
            error,
        };
        match poll {
            Poll::Pending => Ok(report(WireStatus::Pending, None, None)),
            Poll::Running => Ok(report(WireStatus::Running, None, None)),
            Poll::Succeeded(result) => Ok(report(WireStatus::Succeeded, result, None)),
            Poll::Failed(error) => Ok(report(WireStatus::Failed, None, Some(error))),
            Poll::Timeout => Err(ApiError::Timeout),
            Poll::NotFound => Err(ApiError::Status {
                status: 404,
                message: "no such task".into(),
            }),
            Poll::Unauthorized => Err(ApiError::Status {
                status: 401,
                message: "unauthorized".into(),
            }),
        }
    }
}

/// Everything the controller told the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Initiated(TaskKind, String),
    Success(TaskKind, Option<TaskResult>),
    Failure(TaskKind, String),
    SyncWarning,
    Prefill(AttachPrefill),
    RefreshError(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Observed) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Observed) {
        self.events.lock().unwrap().push(event);
    }
}

impl BackupObserver for RecordingObserver {
    fn on_initiated(&self, kind: TaskKind, task_id: &str) {
        self.push(Observed::Initiated(kind, task_id.to_string()));
    }

    fn on_success(&self, kind: TaskKind, result: Option<&TaskResult>) {
        self.push(Observed::Success(kind, result.cloned()));
    }

    fn on_failure(&self, kind: TaskKind, message: &str) {
        self.push(Observed::Failure(kind, message.to_string()));
    }

    fn on_sync_warning(&self) {
        self.push(Observed::SyncWarning);
    }

    fn on_attach_prefill(&self, prefill: &AttachPrefill) {
        self.push(Observed::Prefill(prefill.clone()));
    }

    fn on_refresh_error(&self, message: &str) {
        self.push(Observed::RefreshError(message.to_string()));
    }
}

/// Prompter with fixed answers that logs every question it is asked.
pub struct ScriptedPrompter {
    pub confirm: bool,
    pub reminder: ReminderChoice,
    log: Log,
}

impl ScriptedPrompter {
    pub fn accepting(log: &Log) -> Self {
        Self {
            confirm: true,
            reminder: ReminderChoice::SkipServerBackup,
            log: Arc::clone(log),
        }
    }

    pub fn declining(log: &Log) -> Self {
        Self {
            confirm: false,
            ..Self::accepting(log)
        }
    }

    pub fn with_reminder(mut self, choice: ReminderChoice) -> Self {
        self.reminder = choice;
        self
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        self.log
            .lock()
            .unwrap()
            .push(format!("prompt:confirm:{}", prompt.kind));
        self.confirm
    }

    async fn download_reminder(&self) -> ReminderChoice {
        self.log.lock().unwrap().push("prompt:reminder".to_string());
        self.reminder.clone()
    }
}

/// Prompter whose questions are never answered.
pub struct HangingPrompter;

#[async_trait]
impl Prompter for HangingPrompter {
    async fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        std::future::pending().await
    }

    async fn download_reminder(&self) -> ReminderChoice {
        std::future::pending().await
    }
}

pub fn test_config() -> Config {
    Config {
        poller: PollerConfig {
            interval_ms: 100,
            max_consecutive_failures: 3,
        },
        ..Config::default()
    }
}

pub fn sample_status() -> BackupStatus {
    BackupStatus {
        is_protected: true,
        vault_ids: vec!["vault-a".to_string()],
        next_backup_at: Some(Utc.with_ymd_and_hms(2026, 10, 20, 3, 0, 0).unwrap()),
        expires_at: None,
    }
}

/// Checkpoint created on October `day`, 2026.
pub fn checkpoint(id: &str, day: u32) -> Checkpoint {
    Checkpoint {
        recovery_point_id: id.to_string(),
        vault: "vault-a".to_string(),
        created_at: Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap(),
        status: CheckpointStatus::Completed,
    }
}

pub fn suggested(efs_id: &str) -> TaskResult {
    serde_json::from_value(serde_json::json!({ "SuggestedEFSID": efs_id })).unwrap()
}
