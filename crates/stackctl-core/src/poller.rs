//! Polls server-side tasks until they reach a terminal state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::BackupApi;
use crate::config::PollerConfig;
use crate::task::{Task, TaskState};

struct Watch {
    /// Set by whichever of "terminal delivered" or "cancelled" happens first
    settled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Watches task ids and reports each one's terminal state exactly once.
///
/// Every watch runs as its own tokio task issuing a status request per
/// tick. A watch ends in one of two ways:
/// - the task reaches `Succeeded`/`Failed` (or the poll is abandoned after
///   too many transport failures) and the callback fires;
/// - [`TaskPoller::cancel`] is called, and nothing fires.
///
/// Cancelling only stops observation. The server-side job keeps running.
pub struct TaskPoller {
    api: Arc<dyn BackupApi>,
    config: PollerConfig,
    watches: HashMap<String, Watch>,
    /// Ids whose terminal state was already handed out
    delivered: HashSet<String>,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn BackupApi>, config: PollerConfig) -> Self {
        Self {
            api,
            config,
            watches: HashMap::new(),
            delivered: HashSet::new(),
        }
    }

    /// Starts polling `task` and calls `on_terminal` once it settles.
    ///
    /// Returns false without doing anything if the id is already being
    /// watched or has already been delivered.
    pub fn watch<F>(&mut self, task: Task, on_terminal: F) -> bool
    where
        F: FnOnce(Task) + Send + 'static,
    {
        self.prune();
        if self.watches.contains_key(&task.id) || self.delivered.contains(&task.id) {
            tracing::debug!(task_id = %task.id, "task already watched, ignoring");
            return false;
        }

        tracing::debug!(task_id = %task.id, kind = %task.kind, "watching task");

        let settled = Arc::new(AtomicBool::new(false));
        let id = task.id.clone();
        let handle = tokio::spawn(poll_until_settled(
            Arc::clone(&self.api),
            self.config.clone(),
            task,
            Arc::clone(&settled),
            on_terminal,
        ));

        self.watches.insert(id, Watch { settled, handle });
        true
    }

    /// Stops watching `task_id` without invoking its callback.
    ///
    /// Returns true if a live watch was stopped. Cancelling an unknown or
    /// already-delivered id is a no-op.
    pub fn cancel(&mut self, task_id: &str) -> bool {
        let Some(watch) = self.watches.remove(task_id) else {
            return false;
        };

        let was_settled = watch.settled.swap(true, Ordering::AcqRel);
        watch.handle.abort();

        if was_settled {
            // Already delivered; remember it so a re-watch stays a no-op
            self.delivered.insert(task_id.to_string());
            return false;
        }

        tracing::debug!(task_id, "stopped watching task");
        true
    }

    /// Returns true while `task_id` is being polled.
    pub fn is_watching(&self, task_id: &str) -> bool {
        self.watches
            .get(task_id)
            .is_some_and(|w| !w.settled.load(Ordering::Acquire))
    }

    /// Number of watches still polling.
    pub fn active(&self) -> usize {
        self.watches
            .values()
            .filter(|w| !w.settled.load(Ordering::Acquire))
            .count()
    }

    /// Moves delivered watches out of the live map, keeping only their ids.
    fn prune(&mut self) {
        let settled: Vec<String> = self
            .watches
            .iter()
            .filter(|(_, w)| w.settled.load(Ordering::Acquire))
            .map(|(id, _)| id.clone())
            .collect();
        for id in settled {
            self.watches.remove(&id);
            self.delivered.insert(id);
        }
    }
}

impl Drop for TaskPoller {
    fn drop(&mut self) {
        for watch in self.watches.values() {
            watch.settled.store(true, Ordering::Release);
            watch.handle.abort();
        }
    }
}

async fn poll_until_settled<F>(
    api: Arc<dyn BackupApi>,
    config: PollerConfig,
    mut task: Task,
    settled: Arc<AtomicBool>,
    on_terminal: F,
) where
    F: FnOnce(Task) + Send + 'static,
{
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures: u32 = 0;

    loop {
        ticker.tick().await;
        if settled.load(Ordering::Acquire) {
            return;
        }

        match api.task_status(&task.id).await {
            Ok(report) => {
                failures = 0;
                match task.observe(report.into_state()) {
                    Ok(true) => tracing::debug!(
                        task_id = %task.id,
                        state = task.state.display_name(),
                        "task state changed"
                    ),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(task_id = %task.id, error = %e, "ignoring task report"),
                }
                if task.is_terminal() {
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                if !e.is_transient() || failures >= config.max_consecutive_failures {
                    tracing::warn!(
                        task_id = %task.id,
                        failures,
                        transient = e.is_transient(),
                        error = %e,
                        "abandoning task poll"
                    );
                    task.abandon(format!("Lost contact with the task status endpoint: {e}"));
                    break;
                }
                tracing::debug!(task_id = %task.id, failures, error = %e, "task poll failed, retrying");
            }
        }
    }

    if !settled.swap(true, Ordering::AcqRel) {
        on_terminal(task);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::api::ApiError;
    use crate::backup::{AttachRequest, BackupStatus, Checkpoint, RestoreRequest, ScheduleRequest};
    use crate::task::{TaskKind, TaskStatusReport, WireStatus};

    /// Reports every task as finished.
    struct DoneApi;

    #[async_trait]
    impl BackupApi for DoneApi {
        async fn backup_status(&self, _: &str) -> Result<BackupStatus, ApiError> {
            unimplemented!()
        }
        async fn list_checkpoints(&self, _: &str, _: usize) -> Result<Vec<Checkpoint>, ApiError> {
            unimplemented!()
        }
        async fn create_snapshot(&self, _: &str) -> Result<String, ApiError> {
            unimplemented!()
        }
        async fn restore(&self, _: &str, _: &RestoreRequest) -> Result<String, ApiError> {
            unimplemented!()
        }
        async fn configure_schedule(&self, _: &str, _: &ScheduleRequest) -> Result<(), ApiError> {
            unimplemented!()
        }
        async fn attach(&self, _: &str, _: &AttachRequest) -> Result<String, ApiError> {
            unimplemented!()
        }
        async fn export_pv_pvc(&self, _: &str) -> Result<Vec<u8>, ApiError> {
            unimplemented!()
        }
        async fn task_status(&self, _: &str) -> Result<TaskStatusReport, ApiError> {
            Ok(TaskStatusReport {
                status: WireStatus::Succeeded,
                result: None,
                error: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivered_watches_leave_the_live_map() {
        let mut poller = TaskPoller::new(
            Arc::new(DoneApi),
            PollerConfig {
                interval_ms: 100,
                max_consecutive_failures: 2,
            },
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        for n in 1..=3 {
            let tx = tx.clone();
            poller.watch(Task::new(format!("snapshot-{n}"), TaskKind::Snapshot), move |task| {
                let _ = tx.send(task);
            });
            rx.recv().await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.prune();

        assert!(poller.watches.is_empty());
        assert_eq!(poller.delivered.len(), 3);
        assert!(!poller.watch(Task::new("snapshot-2", TaskKind::Snapshot), |_| {}));
    }
}
