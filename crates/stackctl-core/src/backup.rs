//! Wire records and operation requests for a stack's backup subsystem.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::TaskResult;

/// Latest known state of a stack's backup subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupStatus {
    /// Whether the stack is covered by a backup plan
    pub is_protected: bool,
    /// Backup vaults holding this stack's recovery points
    pub vault_ids: Vec<String>,
    /// When the next scheduled backup runs
    pub next_backup_at: Option<DateTime<Utc>>,
    /// When the oldest retained recovery point expires
    pub expires_at: Option<DateTime<Utc>>,
}

/// Status of a recovery point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointStatus {
    #[serde(alias = "COMPLETED", alias = "completed")]
    Completed,
    #[serde(alias = "IN_PROGRESS", alias = "in_progress", alias = "inProgress")]
    InProgress,
    #[serde(alias = "FAILED", alias = "failed")]
    Failed,
}

/// An immutable, server-recorded recovery point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(rename = "recoveryPointID", alias = "recoveryPointId")]
    pub recovery_point_id: String,
    pub vault: String,
    pub created_at: DateTime<Utc>,
    pub status: CheckpointStatus,
}

impl Checkpoint {
    /// Only completed checkpoints can be restored from.
    pub fn is_restorable(&self) -> bool {
        self.status == CheckpointStatus::Completed
    }
}

/// Response to any operation submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(alias = "taskId", alias = "taskID")]
    pub task_id: String,
}

/// Client-side validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select a checkpoint to restore from")]
    NoCheckpointSelected,

    #[error("Provide a storage id or at least one volume claim or workload to attach")]
    EmptyAttachTarget,

    #[error("Daily backup time must be HH:MM (24h), got '{0}'")]
    InvalidDailyTime(String),

    #[error("Retention must be a positive number of days, got '{0}'")]
    InvalidRetention(String),
}

/// Restore from a recovery point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreRequest {
    #[serde(rename = "recoveryPointID")]
    pub recovery_point_id: String,
    /// Also reattach restored storage to the stack's workloads
    pub attach: bool,
}

impl RestoreRequest {
    pub fn new(recovery_point_id: impl Into<String>, attach: bool) -> Self {
        Self {
            recovery_point_id: recovery_point_id.into(),
            attach,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.recovery_point_id.trim().is_empty() {
            return Err(ValidationError::NoCheckpointSelected);
        }
        Ok(())
    }
}

/// Bind storage (and optionally its workloads) to the running stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efs_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pvcs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stss: Vec<String>,
    /// Run a server-side filesystem backup before attaching
    pub backup_pv_pvc: bool,
}

impl Default for AttachRequest {
    fn default() -> Self {
        Self {
            efs_id: None,
            pvcs: Vec::new(),
            stss: Vec::new(),
            backup_pv_pvc: true,
        }
    }
}

impl AttachRequest {
    /// Builds an attach request from a restore's suggestions.
    pub fn from_prefill(prefill: &AttachPrefill) -> Self {
        Self {
            efs_id: prefill.efs_id.clone(),
            pvcs: prefill.pvcs.clone(),
            stss: prefill.stss.clone(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_storage = self
            .efs_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        let has_names = self.pvcs.iter().chain(&self.stss).any(|n| !n.trim().is_empty());

        if !has_storage && !has_names {
            return Err(ValidationError::EmptyAttachTarget);
        }
        Ok(())
    }
}

/// Suggested attach target surfaced after a restore without reattach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachPrefill {
    pub efs_id: Option<String>,
    pub pvcs: Vec<String>,
    pub stss: Vec<String>,
}

impl From<&TaskResult> for AttachPrefill {
    fn from(result: &TaskResult) -> Self {
        Self {
            efs_id: result.suggested_efs_id.clone(),
            pvcs: result.suggested_pvcs.clone(),
            stss: result.suggested_stss.clone(),
        }
    }
}

/// Daily backup schedule and retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Time of day, `HH:MM`
    pub daily: String,
    /// Retention in days
    pub keep: String,
}

impl ScheduleRequest {
    pub fn new(daily: impl Into<String>, keep_days: u32) -> Self {
        Self {
            daily: daily.into(),
            keep: keep_days.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let daily = self.daily.trim();
        if daily.len() != 5 || NaiveTime::parse_from_str(daily, "%H:%M").is_err() {
            return Err(ValidationError::InvalidDailyTime(self.daily.clone()));
        }

        match self.keep.trim().parse::<u32>() {
            Ok(days) if days > 0 => Ok(()),
            _ => Err(ValidationError::InvalidRetention(self.keep.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_request_wire_shape() {
        let request = AttachRequest {
            efs_id: Some("efs-1".into()),
            ..AttachRequest::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "efsId": "efs-1", "backupPvPvc": true })
        );
    }

    #[test]
    fn test_empty_attach_is_rejected() {
        let request = AttachRequest {
            pvcs: vec!["  ".into()],
            ..AttachRequest::default()
        };
        assert_eq!(request.validate(), Err(ValidationError::EmptyAttachTarget));
    }

    #[test]
    fn test_schedule_validation() {
        assert!(ScheduleRequest::new("03:30", 7).validate().is_ok());
        assert!(ScheduleRequest::new("3:30", 7).validate().is_err());
        assert!(ScheduleRequest::new("24:00", 7).validate().is_err());
        assert!(ScheduleRequest::new("03:30", 0).validate().is_err());
    }

    #[test]
    fn test_checkpoint_status_aliases() {
        let json = r#"{
            "recoveryPointID": "cp-1",
            "vault": "vault-a",
            "createdAt": "2026-01-02T03:04:05Z",
            "status": "COMPLETED"
        }"#;
        let checkpoint: Checkpoint = serde_json::from_str(json).unwrap();
        assert!(checkpoint.is_restorable());
    }
}
