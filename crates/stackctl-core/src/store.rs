//! Last-known-good backup status and checkpoints for one stack.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join;
use tokio::sync::watch;

use crate::api::{ApiError, BackupApi};
use crate::backup::{BackupStatus, Checkpoint};

/// Status and checkpoints fetched together.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupSnapshot {
    pub status: BackupStatus,
    /// Most recent first, at most the configured limit
    pub checkpoints: Vec<Checkpoint>,
    pub fetched_at: DateTime<Utc>,
}

/// What presentation code renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreView {
    /// `None` until the first successful refresh
    pub snapshot: Option<BackupSnapshot>,
    /// Message of the most recent failed refresh, cleared on success
    pub last_error: Option<String>,
    /// Bumped on every successful replace
    pub revision: u64,
}

impl StoreView {
    pub fn status(&self) -> Option<&BackupStatus> {
        self.snapshot.as_ref().map(|s| &s.status)
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        self.snapshot
            .as_ref()
            .map(|s| s.checkpoints.as_slice())
            .unwrap_or_default()
    }
}

/// Holds the latest backup snapshot for a stack.
///
/// A refresh fetches status and checkpoints and replaces the held snapshot
/// in one step. If either fetch fails, the previous snapshot stays and
/// only `last_error` changes. Overlapping refreshes are allowed; whichever
/// completes last wins.
pub struct BackupStatusStore {
    api: Arc<dyn BackupApi>,
    stack_id: String,
    checkpoint_limit: usize,
    view: watch::Sender<StoreView>,
}

impl BackupStatusStore {
    pub fn new(api: Arc<dyn BackupApi>, stack_id: impl Into<String>, checkpoint_limit: usize) -> Self {
        let (view, _) = watch::channel(StoreView::default());
        Self {
            api,
            stack_id: stack_id.into(),
            checkpoint_limit,
            view,
        }
    }

    /// Returns the current view.
    pub fn get(&self) -> StoreView {
        self.view.borrow().clone()
    }

    /// Returns a read-only handle that is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<StoreView> {
        self.view.subscribe()
    }

    /// Re-fetches status and checkpoints.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let fetched = try_join(
            self.api.backup_status(&self.stack_id),
            self.api.list_checkpoints(&self.stack_id, self.checkpoint_limit),
        )
        .await;

        let (status, mut checkpoints) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(stack = %self.stack_id, error = %e, "backup status refresh failed");
                let message = e.to_string();
                self.view.send_modify(|view| view.last_error = Some(message));
                return Err(e);
            }
        };

        checkpoints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        checkpoints.truncate(self.checkpoint_limit);

        let snapshot = BackupSnapshot {
            status,
            checkpoints,
            fetched_at: Utc::now(),
        };
        self.view.send_modify(|view| {
            view.snapshot = Some(snapshot);
            view.last_error = None;
            view.revision += 1;
        });

        tracing::debug!(stack = %self.stack_id, "backup status refreshed");
        Ok(())
    }
}
