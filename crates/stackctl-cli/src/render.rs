//! Terminal rendering of controller callbacks and store views.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use stackctl_core::{
    AttachPrefill, BackupObserver, Checkpoint, CheckpointStatus, StoreView, SyncWarning,
    TaskKind, TaskResult,
};

/// Shows a spinner while a task is polled and reports how it ended.
pub(crate) struct ConsoleObserver {
    spinner: ProgressBar,
}

impl ConsoleObserver {
    pub(crate) fn new() -> Self {
        let spinner = ProgressBar::hidden();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { spinner }
    }

    pub(crate) fn stop_spinner(&self) {
        self.spinner.finish_and_clear();
    }
}

impl BackupObserver for ConsoleObserver {
    fn on_initiated(&self, kind: TaskKind, task_id: &str) {
        self.spinner.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.spinner.enable_steady_tick(Duration::from_millis(120));
        self.spinner
            .set_message(format!("{kind} initiated (task {task_id}), waiting for it to finish"));
    }

    fn on_success(&self, kind: TaskKind, _result: Option<&TaskResult>) {
        self.spinner.finish_and_clear();
        println!("{kind} completed.");
    }

    fn on_failure(&self, kind: TaskKind, _message: &str) {
        self.spinner.finish_and_clear();
        eprintln!("{kind} did not complete.");
    }

    fn on_refresh_error(&self, message: &str) {
        eprintln!("Could not refresh backup status: {message}");
    }
}

pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M %Z")
        .to_string()
}

pub(crate) fn print_status(stack_id: &str, view: &StoreView) {
    let Some(status) = view.status() else {
        println!("No backup status available for {stack_id}.");
        return;
    };

    println!("Stack:       {stack_id}");
    println!(
        "Protected:   {}",
        if status.is_protected { "yes" } else { "no" }
    );
    if !status.vault_ids.is_empty() {
        println!("Vaults:      {}", status.vault_ids.join(", "));
    }
    if let Some(next) = &status.next_backup_at {
        println!("Next backup: {}", format_time(next));
    }
    if let Some(expiry) = &status.expires_at {
        println!("Expires:     {}", format_time(expiry));
    }
    if let Some(latest) = view.checkpoints().first() {
        println!("Latest:      {} ({})", latest.recovery_point_id, format_time(&latest.created_at));
    }
}

pub(crate) fn print_checkpoints(checkpoints: &[Checkpoint]) {
    if checkpoints.is_empty() {
        println!("No checkpoints yet. Use 'stackctl snapshot' to create one.");
        return;
    }

    println!("{:<40} {:<12} {:<24} VAULT", "RECOVERY POINT", "STATUS", "CREATED");
    for cp in checkpoints {
        let status = match cp.status {
            CheckpointStatus::Completed => "completed",
            CheckpointStatus::InProgress => "in progress",
            CheckpointStatus::Failed => "failed",
        };
        println!(
            "{:<40} {:<12} {:<24} {}",
            cp.recovery_point_id,
            status,
            format_time(&cp.created_at),
            cp.vault
        );
    }
}

pub(crate) fn print_sync_warning(warning: &SyncWarning) {
    println!();
    println!("Note: storage was attached to running workloads by the {}.", warning.kind);
    println!("Those workloads must re-sync blocks before they are fully operational.");
}

pub(crate) fn print_attach_hint(prefill: &AttachPrefill) {
    let mut args = Vec::new();
    if let Some(efs_id) = &prefill.efs_id {
        args.push(format!("--efs-id {efs_id}"));
    }
    args.extend(prefill.pvcs.iter().map(|p| format!("--pvc {p}")));
    args.extend(prefill.stss.iter().map(|s| format!("--sts {s}")));

    if args.is_empty() {
        println!("Restore finished. Inspect the restored data, then attach it with 'stackctl attach'.");
    } else {
        println!("Restore finished. To attach the restored storage run:");
        println!("  stackctl attach {}", args.join(" "));
    }
}
