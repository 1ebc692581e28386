//! Operation launchers: validate → confirm → submit.

use std::ops::{Deref, DerefMut};

use crate::backup::{AttachRequest, RestoreRequest};
use crate::observer::{ConfirmPrompt, Prompter, ReminderChoice};
use crate::phase::OperationPhase;
use crate::task::{Task, TaskKind};

use super::{BackupController, InFlight, LaunchContext, LaunchError};

/// What a launcher did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The server accepted the operation and the task is being polled
    Initiated { task_id: String },
    /// The user backed out before anything was sent
    Cancelled,
}

enum Submission {
    Snapshot,
    Restore(RestoreRequest),
    Attach(AttachRequest),
}

impl Submission {
    fn kind(&self) -> TaskKind {
        match self {
            Submission::Snapshot => TaskKind::Snapshot,
            Submission::Restore(_) => TaskKind::Restore,
            Submission::Attach(_) => TaskKind::Attach,
        }
    }

    fn context(&self) -> LaunchContext {
        match self {
            Submission::Snapshot => LaunchContext::Snapshot,
            Submission::Restore(r) => LaunchContext::Restore { attach: r.attach },
            Submission::Attach(_) => LaunchContext::Attach,
        }
    }

    fn prompt(&self, stack_id: &str) -> ConfirmPrompt {
        let message = match self {
            Submission::Snapshot => format!("Create a backup snapshot of stack {stack_id} now?"),
            Submission::Restore(r) if r.attach => format!(
                "Restore stack {stack_id} from {} and reattach its workloads?",
                r.recovery_point_id
            ),
            Submission::Restore(r) => format!(
                "Restore stack {stack_id} from {} without reattaching workloads?",
                r.recovery_point_id
            ),
            Submission::Attach(a) => {
                let target = a.efs_id.as_deref().unwrap_or("existing storage");
                format!(
                    "Attach {target} to stack {stack_id} ({} volume claims, {} workloads)?",
                    a.pvcs.len(),
                    a.stss.len()
                )
            }
        };
        ConfirmPrompt {
            kind: self.kind(),
            message,
        }
    }
}

impl BackupController {
    /// Creates a snapshot of the stack.
    pub async fn launch_snapshot(
        &mut self,
        prompter: &dyn Prompter,
    ) -> Result<LaunchOutcome, LaunchError> {
        self.launch(Submission::Snapshot, prompter).await
    }

    /// Restores the stack from a checkpoint.
    pub async fn launch_restore(
        &mut self,
        request: RestoreRequest,
        prompter: &dyn Prompter,
    ) -> Result<LaunchOutcome, LaunchError> {
        self.launch(Submission::Restore(request), prompter).await
    }

    /// Attaches storage to the stack's workloads.
    ///
    /// Until a local download has completed in the current attach session
    /// the server-side filesystem backup is forced on, and the user is
    /// reminded to take a local copy before anything is submitted.
    pub async fn launch_attach(
        &mut self,
        request: AttachRequest,
        prompter: &dyn Prompter,
    ) -> Result<LaunchOutcome, LaunchError> {
        self.launch(Submission::Attach(request), prompter).await
    }

    async fn launch(
        &mut self,
        mut submission: Submission,
        prompter: &dyn Prompter,
    ) -> Result<LaunchOutcome, LaunchError> {
        let kind = submission.kind();
        let phase = self.phase(kind);
        if phase.is_busy() {
            tracing::warn!(
                kind = %kind,
                phase = phase.display_name(),
                "rejecting launch: operation already in progress"
            );
            return Err(LaunchError::AlreadyInFlight(kind));
        }

        match &submission {
            Submission::Snapshot => {}
            Submission::Restore(r) => r.validate()?,
            Submission::Attach(a) => a.validate()?,
        }

        // Every exit before `track`, including a dropped future, ends in Idle
        let mut this = LaunchGuard::new(self, kind);
        this.set_phase(kind, OperationPhase::Confirming);

        if !prompter.confirm(&submission.prompt(&this.stack_id)).await {
            tracing::debug!(kind = %kind, "launch cancelled by user");
            return Ok(LaunchOutcome::Cancelled);
        }

        if let Submission::Attach(request) = &mut submission {
            if !this.has_local_download() {
                request.backup_pv_pvc = true;
            }
            if request.backup_pv_pvc && !this.has_local_download() {
                match prompter.download_reminder().await {
                    ReminderChoice::DownloadNow { destination } => {
                        this.download_local_backup(&destination).await?;
                    }
                    ReminderChoice::SkipServerBackup => request.backup_pv_pvc = false,
                    ReminderChoice::Cancel => {
                        tracing::debug!(kind = %kind, "launch cancelled at download reminder");
                        return Ok(LaunchOutcome::Cancelled);
                    }
                }
            }
        }

        this.set_phase(kind, OperationPhase::Submitting);

        let submitted = match &submission {
            Submission::Snapshot => this.api.create_snapshot(&this.stack_id).await,
            Submission::Restore(r) => this.api.restore(&this.stack_id, r).await,
            Submission::Attach(a) => this.api.attach(&this.stack_id, a).await,
        };
        let task_id = submitted.map_err(|e| {
            tracing::warn!(kind = %kind, error = %e, "submission failed");
            LaunchError::submission(kind, e)
        })?;

        this.track(kind, task_id.clone(), submission.context());
        this.tracked = true;
        Ok(LaunchOutcome::Initiated { task_id })
    }

    fn track(&mut self, kind: TaskKind, task_id: String, context: LaunchContext) {
        if let Some(op) = self.operations.get_mut(&kind) {
            op.phase = OperationPhase::Polling;
            op.in_flight = Some(InFlight {
                task_id: task_id.clone(),
                context,
            });
        }

        tracing::info!(stack = %self.stack_id, kind = %kind, task_id = %task_id, "operation initiated");
        self.observer.on_initiated(kind, &task_id);

        let tx = self.settled_tx.clone();
        self.poller.watch(Task::new(task_id, kind), move |task| {
            // Receiver lives as long as the controller
            let _ = tx.send(task);
        });
    }

    fn set_phase(&mut self, kind: TaskKind, phase: OperationPhase) {
        if let Some(op) = self.operations.get_mut(&kind) {
            tracing::trace!(kind = %kind, phase = phase.display_name(), "phase change");
            op.phase = phase;
        }
    }
}

/// Exclusive access to the controller for one launch.
///
/// Unless the launch reached `track`, dropping the guard puts the kind
/// back to `Idle`. This covers early returns as well as a caller that
/// drops the launch future while a prompt or request is pending.
struct LaunchGuard<'a> {
    controller: &'a mut BackupController,
    kind: TaskKind,
    tracked: bool,
}

impl<'a> LaunchGuard<'a> {
    fn new(controller: &'a mut BackupController, kind: TaskKind) -> Self {
        Self {
            controller,
            kind,
            tracked: false,
        }
    }
}

impl Deref for LaunchGuard<'_> {
    type Target = BackupController;

    fn deref(&self) -> &Self::Target {
        self.controller
    }
}

impl DerefMut for LaunchGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.controller
    }
}

impl Drop for LaunchGuard<'_> {
    fn drop(&mut self) {
        if !self.tracked {
            self.controller.set_phase(self.kind, OperationPhase::Idle);
        }
    }
}
