//! Contract between the orchestration core and whatever renders it.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::backup::AttachPrefill;
use crate::task::{TaskKind, TaskResult};

/// Callbacks raised by the controller. All methods default to no-ops.
///
/// Implementations only observe; they never mutate controller state.
pub trait BackupObserver: Send + Sync {
    /// A launcher submitted an operation and the server accepted it.
    fn on_initiated(&self, _kind: TaskKind, _task_id: &str) {}

    /// A tracked task finished successfully.
    fn on_success(&self, _kind: TaskKind, _result: Option<&TaskResult>) {}

    /// A tracked task failed, or its poll was abandoned.
    fn on_failure(&self, _kind: TaskKind, _message: &str) {}

    /// Reattached workloads need to re-sync before they are fully operational.
    fn on_sync_warning(&self) {}

    /// A restore without reattach finished; these are its attach suggestions.
    fn on_attach_prefill(&self, _prefill: &AttachPrefill) {}

    /// Status refresh failed; last-known-good data is still shown.
    fn on_refresh_error(&self, _message: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BackupObserver for NoopObserver {}

/// What the user is asked to confirm before a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub kind: TaskKind,
    pub message: String,
}

/// Answer to the download reminder shown before an attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderChoice {
    /// Download a local copy to `destination`, then attach with the
    /// server-side filesystem backup still enabled
    DownloadNow { destination: PathBuf },
    /// Attach without the server-side filesystem backup
    SkipServerBackup,
    /// Back out of the attach entirely
    Cancel,
}

/// Human-in-the-loop gates used by the launchers.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Returns true if the user confirms the operation.
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;

    /// Asks how to proceed when neither safety copy has been taken yet.
    async fn download_reminder(&self) -> ReminderChoice;
}
