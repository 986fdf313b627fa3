use std::path::PathBuf;
use thiserror::Error;

use crate::models::CoreType;
use crate::runner::RunState;

/// Central error type for the launcher core.
/// Every fallible operation returns `LauncherResult<T>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── Launch preconditions ────────────────────────────
    #[error("no usable java runtime found (tried PATH and well-known install locations)")]
    RuntimeNotFound,

    #[error("server artifact not found: {0}")]
    ArtifactMissing(String),

    #[error("license not accepted: {0}")]
    LicenseNotAccepted(String),

    // ── Process lifecycle ───────────────────────────────
    #[error("server process is not running")]
    ProcessNotRunning,

    #[error("server is already {0}")]
    AlreadyRunning(RunState),

    #[error("operation not allowed while server is {0}")]
    InvalidState(RunState),

    #[error("failed to start server process: {0}")]
    ProcessSpawnFailed(String),

    // ── Download ────────────────────────────────────────
    #[error("no download url for {core_type} {version}; provide a manual url")]
    DownloadUnresolvable { core_type: CoreType, version: String },

    #[error("download failed for {url}")]
    DownloadFailed { url: String },

    // ── Backups ─────────────────────────────────────────
    #[error("backup {name} incomplete: {message}")]
    BackupPartialFailure { name: String, message: String },

    #[error("backup not found: {0}")]
    BackupNotFound(String),

    // ── Config ──────────────────────────────────────────
    #[error("failed to load profile {path:?}: {message}")]
    ConfigLoadFailure { path: PathBuf, message: String },

    // ── Tasks ───────────────────────────────────────────
    #[error("background task {0} was cancelled")]
    TaskCancelled(String),

    // ── Generic ─────────────────────────────────────────
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short stable label (snake_case) for logs and API responses.
    pub fn as_label(&self) -> &'static str {
        match self {
            LauncherError::RuntimeNotFound => "runtime_not_found",
            LauncherError::ArtifactMissing(_) => "artifact_missing",
            LauncherError::LicenseNotAccepted(_) => "license_not_accepted",
            LauncherError::ProcessNotRunning => "process_not_running",
            LauncherError::AlreadyRunning(_) => "already_running",
            LauncherError::InvalidState(_) => "invalid_state",
            LauncherError::ProcessSpawnFailed(_) => "process_spawn_failed",
            LauncherError::DownloadUnresolvable { .. } => "download_unresolvable",
            LauncherError::DownloadFailed { .. } => "download_failed",
            LauncherError::BackupPartialFailure { .. } => "backup_partial_failure",
            LauncherError::BackupNotFound(_) => "backup_not_found",
            LauncherError::ConfigLoadFailure { .. } => "config_load_failure",
            LauncherError::TaskCancelled(_) => "task_cancelled",
            LauncherError::Io { .. } => "io",
            LauncherError::Json(_) => "json",
            LauncherError::Zip(_) => "zip",
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            LauncherError::ArtifactMissing("x.jar".to_string()).as_label(),
            "artifact_missing"
        );
        assert_eq!(LauncherError::ProcessNotRunning.as_label(), "process_not_running");
        assert_eq!(
            LauncherError::AlreadyRunning(RunState::Running).to_string(),
            "server is already running"
        );
    }
}
