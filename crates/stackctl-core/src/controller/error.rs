use std::path::PathBuf;
use thiserror::Error;

use crate::api::ApiError;
use crate::backup::ValidationError;
use crate::task::TaskKind;

/// Errors returned by the operation launchers.
///
/// Task failures are not here: they happen after submission and are
/// reported through [`crate::BackupObserver::on_failure`].
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("A {0} operation is already in progress")]
    AlreadyInFlight(TaskKind),

    #[error("Failed to submit {kind}: {source}")]
    Submission {
        kind: TaskKind,
        #[source]
        source: ApiError,
    },

    #[error("Failed to update backup schedule: {0}")]
    Schedule(#[source] ApiError),

    #[error("Local backup download failed: {0}")]
    Download(#[from] DownloadError),
}

impl LaunchError {
    pub fn submission(kind: TaskKind, source: ApiError) -> Self {
        LaunchError::Submission { kind, source }
    }
}

/// Errors that can occur while saving a local filesystem backup.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("export request failed: {0}")]
    Api(#[from] ApiError),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }
}
