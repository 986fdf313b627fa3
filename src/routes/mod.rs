pub mod backups;
pub mod cores;
pub mod health;
pub mod run;

use crate::services::AppState;
use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use launcher::LauncherError;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/run/status", get(run::run_status))
        .route("/api/run/start", post(run::run_start))
        .route("/api/run/stop", post(run::run_stop))
        .route("/api/run/restart", post(run::run_restart))
        .route("/api/run/command", post(run::run_command))
        .route("/api/run/logs/tail", get(run::run_logs_tail))
        .route("/api/run/logs/stream", get(run::run_logs_stream))
        .route("/api/backups", get(backups::list).post(backups::create))
        .route("/api/backups/:name", delete(backups::remove))
        .route("/api/profile", get(cores::profile))
        .route("/api/core/detect", post(cores::detect))
        .route("/api/core/url", get(cores::resolve_url))
        .route("/api/core/download", post(cores::download))
        .route("/api/license/accept", post(cores::accept_license))
        .route("/health", get(health::health))
        .with_state(state)
}

/// Maps a launcher error onto the status/body pair the handlers return.
pub(crate) fn error_response(err: LauncherError) -> (StatusCode, String) {
    let status = match &err {
        LauncherError::ArtifactMissing(_)
        | LauncherError::RuntimeNotFound
        | LauncherError::LicenseNotAccepted(_)
        | LauncherError::DownloadUnresolvable { .. } => StatusCode::BAD_REQUEST,
        LauncherError::AlreadyRunning(_)
        | LauncherError::InvalidState(_)
        | LauncherError::ProcessNotRunning => StatusCode::CONFLICT,
        LauncherError::BackupNotFound(_) => StatusCode::NOT_FOUND,
        LauncherError::DownloadFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("{}: {err}", err.as_label()))
}
