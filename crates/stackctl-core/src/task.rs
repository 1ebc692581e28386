use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three kinds of long-running backup operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Snapshot,
    Restore,
    Attach,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Snapshot, TaskKind::Restore, TaskKind::Attach];

    /// Returns a human-readable name for the kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskKind::Snapshot => "Snapshot",
            TaskKind::Restore => "Restore",
            TaskKind::Attach => "Attach",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Payload of a successful task.
///
/// Only restores carry meaningful fields today: the identifiers the
/// server suggests for a follow-up attach. Anything else the server sends
/// is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(
        rename = "SuggestedEFSID",
        alias = "suggestedEfsId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub suggested_efs_id: Option<String>,

    #[serde(rename = "SuggestedPVCs", alias = "suggestedPvcs", default)]
    pub suggested_pvcs: Vec<String>,

    #[serde(rename = "SuggestedSTSs", alias = "suggestedStss", default)]
    pub suggested_stss: Vec<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Lifecycle state of a server-side task.
///
/// `Pending → Running → {Succeeded, Failed}`, with `Pending` allowed to
/// jump straight to a terminal state. Nothing leaves a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded { result: Option<TaskResult> },
    Failed { error: String },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded { .. } | TaskState::Failed { .. })
    }

    fn rank(&self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Succeeded { .. } | TaskState::Failed { .. } => 2,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskState::Pending => "Pending",
            TaskState::Running => "Running",
            TaskState::Succeeded { .. } => "Succeeded",
            TaskState::Failed { .. } => "Failed",
        }
    }
}

/// One server-side long-running job, as tracked by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Opaque identifier assigned by the server
    pub id: String,
    pub kind: TaskKind,
    pub state: TaskState,
    /// When the submit call returned this id
    pub submitted_at: DateTime<Utc>,
    /// When the state last changed
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a freshly submitted task in the `Pending` state.
    pub fn new(id: impl Into<String>, kind: TaskKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            state: TaskState::Pending,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// Marks the task failed with a client-side message.
    ///
    /// Used when the client gives up on a task it can no longer observe.
    pub fn abandon(&mut self, error: impl Into<String>) {
        self.state = TaskState::Failed {
            error: error.into(),
        };
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Applies an observed state.
    ///
    /// Returns `Ok(true)` if the state moved forward, `Ok(false)` if it is
    /// unchanged, and an error for any backwards or post-terminal move.
    pub fn observe(&mut self, next: TaskState) -> Result<bool, TaskError> {
        if self.state.is_terminal() {
            if self.state == next {
                return Ok(false);
            }
            return Err(TaskError::AlreadyTerminal {
                id: self.id.clone(),
                state: self.state.display_name(),
            });
        }

        if next.rank() < self.state.rank() {
            return Err(TaskError::Regression {
                id: self.id.clone(),
                from: self.state.display_name(),
                to: next.display_name(),
            });
        }

        if next == self.state {
            return Ok(false);
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(true)
    }
}

/// Status keyword reported by the task endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WireStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl FromStr for WireStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => Ok(WireStatus::Pending),
            "running" | "in_progress" | "inprogress" => Ok(WireStatus::Running),
            "succeeded" | "success" | "completed" => Ok(WireStatus::Succeeded),
            "failed" | "error" => Ok(WireStatus::Failed),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

impl TryFrom<String> for WireStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WireStatus> for String {
    fn from(status: WireStatus) -> Self {
        match status {
            WireStatus::Pending => "Pending",
            WireStatus::Running => "Running",
            WireStatus::Succeeded => "Succeeded",
            WireStatus::Failed => "Failed",
        }
        .to_string()
    }
}

/// Body returned by the task-status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub status: WireStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusReport {
    /// Collapses the loosely-shaped report into a closed state.
    pub fn into_state(self) -> TaskState {
        match self.status {
            WireStatus::Pending => TaskState::Pending,
            WireStatus::Running => TaskState::Running,
            WireStatus::Succeeded => TaskState::Succeeded {
                result: self.result,
            },
            WireStatus::Failed => TaskState::Failed {
                error: self
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "task failed without an error message".to_string()),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task {id} is already {state}")]
    AlreadyTerminal { id: String, state: &'static str },

    #[error("Task {id} cannot go from {from} back to {to}")]
    Regression {
        id: String,
        from: &'static str,
        to: &'static str,
    },
}
