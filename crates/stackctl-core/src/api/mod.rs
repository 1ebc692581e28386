mod error;
mod http;

pub use error::ApiError;
pub use http::HttpBackupApi;

use std::sync::Arc;

use async_trait::async_trait;

use crate::backup::{AttachRequest, BackupStatus, Checkpoint, RestoreRequest, ScheduleRequest};
use crate::task::TaskStatusReport;

/// REST surface of a stack's backup subsystem.
///
/// This abstraction keeps the orchestration logic independent of the
/// transport, so tests can drive it with a scripted fake.
///
/// Submissions (`create_snapshot`, `restore`, `attach`) return as soon as
/// the server has accepted the job, yielding its task id. Completion is
/// only observable through `task_status`.
#[async_trait]
pub trait BackupApi: Send + Sync {
    /// Fetch the stack's backup status record.
    async fn backup_status(&self, stack_id: &str) -> Result<BackupStatus, ApiError>;

    /// Fetch up to `limit` checkpoints, most recent first.
    async fn list_checkpoints(
        &self,
        stack_id: &str,
        limit: usize,
    ) -> Result<Vec<Checkpoint>, ApiError>;

    /// Start a snapshot. Returns the task id.
    async fn create_snapshot(&self, stack_id: &str) -> Result<String, ApiError>;

    /// Start a restore. Returns the task id.
    async fn restore(&self, stack_id: &str, request: &RestoreRequest) -> Result<String, ApiError>;

    /// Replace the daily backup schedule and retention.
    async fn configure_schedule(
        &self,
        stack_id: &str,
        request: &ScheduleRequest,
    ) -> Result<(), ApiError>;

    /// Start attaching storage. Returns the task id.
    async fn attach(&self, stack_id: &str, request: &AttachRequest) -> Result<String, ApiError>;

    /// Download an archive of the stack's persistent volumes.
    async fn export_pv_pvc(&self, stack_id: &str) -> Result<Vec<u8>, ApiError>;

    /// Fetch the current status of a task.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport, ApiError>;
}

/// Blanket implementation for shared trait objects.
#[async_trait]
impl BackupApi for Arc<dyn BackupApi> {
    async fn backup_status(&self, stack_id: &str) -> Result<BackupStatus, ApiError> {
        (**self).backup_status(stack_id).await
    }

    async fn list_checkpoints(
        &self,
        stack_id: &str,
        limit: usize,
    ) -> Result<Vec<Checkpoint>, ApiError> {
        (**self).list_checkpoints(stack_id, limit).await
    }

    async fn create_snapshot(&self, stack_id: &str) -> Result<String, ApiError> {
        (**self).create_snapshot(stack_id).await
    }

    async fn restore(&self, stack_id: &str, request: &RestoreRequest) -> Result<String, ApiError> {
        (**self).restore(stack_id, request).await
    }

    async fn configure_schedule(
        &self,
        stack_id: &str,
        request: &ScheduleRequest,
    ) -> Result<(), ApiError> {
        (**self).configure_schedule(stack_id, request).await
    }

    async fn attach(&self, stack_id: &str, request: &AttachRequest) -> Result<String, ApiError> {
        (**self).attach(stack_id, request).await
    }

    async fn export_pv_pvc(&self, stack_id: &str) -> Result<Vec<u8>, ApiError> {
        (**self).export_pv_pvc(stack_id).await
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport, ApiError> {
        (**self).task_status(task_id).await
    }
}
