pub mod api;
pub mod backup;
pub mod config;
pub mod controller;
pub mod observer;
pub mod phase;
pub mod poller;
pub mod store;
pub mod task;

pub use api::{ApiError, BackupApi, HttpBackupApi};
pub use backup::{
    AttachPrefill, AttachRequest, BackupStatus, Checkpoint, CheckpointStatus, RestoreRequest,
    ScheduleRequest, ValidationError,
};
pub use config::{ApiConfig, BackupConfig, Config, ConfigError, PollerConfig};
pub use controller::{
    BackupController, DownloadError, LaunchError, LaunchOutcome, Settlement, SyncWarning,
};
pub use observer::{BackupObserver, ConfirmPrompt, NoopObserver, Prompter, ReminderChoice};
pub use phase::OperationPhase;
pub use poller::TaskPoller;
pub use store::{BackupSnapshot, BackupStatusStore, StoreView};
pub use task::{Task, TaskError, TaskKind, TaskResult, TaskState, TaskStatusReport, WireStatus};
