//! Orchestration of snapshot, restore and attach operations for one stack.

mod error;
mod launcher;

pub use error::{DownloadError, LaunchError};
pub use launcher::LaunchOutcome;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use crate::api::{ApiError, BackupApi, HttpBackupApi};
use crate::backup::{AttachPrefill, ScheduleRequest};
use crate::config::Config;
use crate::observer::BackupObserver;
use crate::phase::OperationPhase;
use crate::poller::TaskPoller;
use crate::store::{BackupStatusStore, StoreView};
use crate::task::{Task, TaskKind, TaskResult, TaskState};

/// Request details the controller needs once a task settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaunchContext {
    Snapshot,
    Restore { attach: bool },
    Attach,
}

#[derive(Debug, Clone)]
struct InFlight {
    task_id: String,
    context: LaunchContext,
}

#[derive(Debug, Default)]
struct Operation {
    phase: OperationPhase,
    in_flight: Option<InFlight>,
}

/// State of the attach dialog currently open.
#[derive(Debug, Clone, Default)]
struct AttachSession {
    downloaded: bool,
}

/// Advisory notice raised after storage is (re)attached to live workloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWarning {
    /// Operation that raised it
    pub kind: TaskKind,
    pub raised_at: DateTime<Utc>,
}

/// How a tracked task ended, after the controller applied its effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Succeeded {
        kind: TaskKind,
        task_id: String,
        result: Option<TaskResult>,
    },
    Failed {
        kind: TaskKind,
        task_id: String,
        error: String,
    },
}

impl Settlement {
    pub fn kind(&self) -> TaskKind {
        match self {
            Settlement::Succeeded { kind, .. } | Settlement::Failed { kind, .. } => *kind,
        }
    }
}

/// Single authority for what is running and what happens when it ends.
///
/// Holds at most one in-flight task per [`TaskKind`]. Terminal results
/// arrive from the [`TaskPoller`] over a channel and are applied by
/// [`BackupController::next_event`], so every mutation of controller and
/// store state happens on the caller's task.
pub struct BackupController {
    stack_id: String,
    api: Arc<dyn BackupApi>,
    store: BackupStatusStore,
    poller: TaskPoller,
    observer: Arc<dyn BackupObserver>,
    operations: HashMap<TaskKind, Operation>,
    attach_session: AttachSession,
    sync_warning: Option<SyncWarning>,
    attach_prefill: Option<AttachPrefill>,
    settled_tx: mpsc::UnboundedSender<Task>,
    settled_rx: mpsc::UnboundedReceiver<Task>,
}

impl BackupController {
    /// Creates a controller for `stack_id` talking to `api`.
    pub fn new(
        api: Arc<dyn BackupApi>,
        stack_id: impl Into<String>,
        config: &Config,
        observer: Arc<dyn BackupObserver>,
    ) -> Self {
        let stack_id = stack_id.into();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();

        Self {
            store: BackupStatusStore::new(
                Arc::clone(&api),
                stack_id.clone(),
                config.backup.checkpoint_limit,
            ),
            poller: TaskPoller::new(Arc::clone(&api), config.poller.clone()),
            operations: TaskKind::ALL
                .into_iter()
                .map(|kind| (kind, Operation::default()))
                .collect(),
            stack_id,
            api,
            observer,
            attach_session: AttachSession::default(),
            sync_warning: None,
            attach_prefill: None,
            settled_tx,
            settled_rx,
        }
    }

    /// Creates a controller backed by the HTTP API described in `config`.
    pub fn from_config(
        config: &Config,
        stack_id: impl Into<String>,
        observer: Arc<dyn BackupObserver>,
    ) -> Self {
        let api: Arc<dyn BackupApi> = Arc::new(HttpBackupApi::from_config(&config.api));
        Self::new(api, stack_id, config, observer)
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    /// Current phase of the given operation kind.
    pub fn phase(&self, kind: TaskKind) -> OperationPhase {
        self.operations
            .get(&kind)
            .map(|op| op.phase)
            .unwrap_or_default()
    }

    /// Id of the task being tracked for `kind`, if any.
    pub fn in_flight(&self, kind: TaskKind) -> Option<&str> {
        self.operations
            .get(&kind)
            .and_then(|op| op.in_flight.as_ref())
            .map(|f| f.task_id.as_str())
    }

    /// Returns true if any operation kind is being polled.
    pub fn has_in_flight(&self) -> bool {
        self.operations.values().any(|op| op.in_flight.is_some())
    }

    /// Latest store view.
    pub fn view(&self) -> StoreView {
        self.store.get()
    }

    /// Read-only subscription to store changes.
    pub fn subscribe(&self) -> watch::Receiver<StoreView> {
        self.store.subscribe()
    }

    /// Re-fetches backup status and checkpoints.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.store.refresh().await
    }

    pub fn sync_warning(&self) -> Option<&SyncWarning> {
        self.sync_warning.as_ref()
    }

    pub fn dismiss_sync_warning(&mut self) {
        self.sync_warning = None;
    }

    /// Pending attach suggestions from the last restore without reattach.
    pub fn attach_prefill(&self) -> Option<&AttachPrefill> {
        self.attach_prefill.as_ref()
    }

    /// Takes the pending attach suggestions, clearing them.
    pub fn take_attach_prefill(&mut self) -> Option<AttachPrefill> {
        self.attach_prefill.take()
    }

    /// Starts a new attach dialog session.
    ///
    /// A previous local download does not count for the new session.
    pub fn begin_attach_session(&mut self) {
        self.attach_session = AttachSession::default();
    }

    /// Returns true if a local download completed in this attach session.
    pub fn has_local_download(&self) -> bool {
        self.attach_session.downloaded
    }

    /// Downloads the persistent-volume archive and writes it to `destination`.
    ///
    /// On success the current attach session counts as having a local copy.
    pub async fn download_local_backup(&mut self, destination: &Path) -> Result<u64, DownloadError> {
        let archive = self.api.export_pv_pvc(&self.stack_id).await?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }
        tokio::fs::write(destination, &archive)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;

        self.attach_session.downloaded = true;
        tracing::info!(
            stack = %self.stack_id,
            path = %destination.display(),
            bytes = archive.len(),
            "local filesystem backup saved"
        );
        Ok(archive.len() as u64)
    }

    /// Replaces the daily backup schedule, then refreshes the store.
    pub async fn configure_schedule(&mut self, request: &ScheduleRequest) -> Result<(), LaunchError> {
        request.validate()?;

        self.api
            .configure_schedule(&self.stack_id, request)
            .await
            .map_err(LaunchError::Schedule)?;

        tracing::info!(
            stack = %self.stack_id,
            daily = %request.daily,
            keep = %request.keep,
            "backup schedule updated"
        );
        self.refresh_store().await;
        Ok(())
    }

    /// Stops observing the task of `kind` without cancelling the server job.
    ///
    /// No callback fires for that task afterwards, and the kind becomes
    /// available for a new launch.
    pub fn close_progress(&mut self, kind: TaskKind) -> bool {
        let Some(op) = self.operations.get_mut(&kind) else {
            return false;
        };
        let Some(in_flight) = op.in_flight.take() else {
            return false;
        };

        self.poller.cancel(&in_flight.task_id);
        op.phase = OperationPhase::Idle;
        tracing::info!(
            kind = %kind,
            task_id = %in_flight.task_id,
            "stopped observing task; the server job keeps running"
        );
        true
    }

    /// Waits for the next tracked task to settle and applies its effects.
    ///
    /// Returns `None` once nothing is in flight and no result is queued.
    pub async fn next_event(&mut self) -> Option<Settlement> {
        loop {
            let task = match self.settled_rx.try_recv() {
                Ok(task) => task,
                Err(_) if !self.has_in_flight() => return None,
                Err(_) => self.settled_rx.recv().await?,
            };

            if let Some(settlement) = self.settle(task).await {
                return Some(settlement);
            }
        }
    }

    /// Applies every result already queued, without waiting.
    pub async fn process_pending(&mut self) -> Vec<Settlement> {
        let mut settled = Vec::new();
        while let Ok(task) = self.settled_rx.try_recv() {
            if let Some(settlement) = self.settle(task).await {
                settled.push(settlement);
            }
        }
        settled
    }

    async fn settle(&mut self, task: Task) -> Option<Settlement> {
        if !task.is_terminal() {
            tracing::warn!(task_id = %task.id, "poller delivered a non-terminal task");
            return None;
        }

        let op = self.operations.get_mut(&task.kind)?;
        let is_current = op
            .in_flight
            .as_ref()
            .is_some_and(|f| f.task_id == task.id);
        if !is_current {
            tracing::debug!(task_id = %task.id, kind = %task.kind, "dropping result for untracked task");
            return None;
        }

        let in_flight = op.in_flight.take()?;
        op.phase = OperationPhase::Idle;
        let kind = task.kind;

        match task.state {
            TaskState::Succeeded { result } => {
                tracing::info!(kind = %kind, task_id = %task.id, "task succeeded");
                self.refresh_store().await;
                self.observer.on_success(kind, result.as_ref());

                match in_flight.context {
                    LaunchContext::Snapshot => {}
                    LaunchContext::Restore { attach: false } => {
                        let prefill = result.as_ref().map(AttachPrefill::from).unwrap_or_default();
                        self.observer.on_attach_prefill(&prefill);
                        self.attach_prefill = Some(prefill);
                    }
                    LaunchContext::Restore { attach: true } | LaunchContext::Attach => {
                        self.raise_sync_warning(kind);
                    }
                }

                Some(Settlement::Succeeded {
                    kind,
                    task_id: task.id,
                    result,
                })
            }
            TaskState::Failed { error } => {
                tracing::warn!(kind = %kind, task_id = %task.id, error = %error, "task failed");
                self.observer.on_failure(kind, &error);
                Some(Settlement::Failed {
                    kind,
                    task_id: task.id,
                    error,
                })
            }
            TaskState::Pending | TaskState::Running => None,
        }
    }

    fn raise_sync_warning(&mut self, kind: TaskKind) {
        self.sync_warning = Some(SyncWarning {
            kind,
            raised_at: Utc::now(),
        });
        self.observer.on_sync_warning();
    }

    async fn refresh_store(&self) {
        if let Err(e) = self.store.refresh().await {
            self.observer.on_refresh_error(&e.to_string());
        }
    }
}
