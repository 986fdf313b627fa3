use super::error_response;
use crate::services::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use launcher::models::BackupRecord;

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<BackupRecord>>, (StatusCode, String)> {
    let records = state.backups().await.map_err(error_response)?;
    Ok(Json(records))
}

pub async fn create(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BackupRecord>), (StatusCode, String)> {
    let record = state
        .create_backup()
        .join()
        .await
        .and_then(|result| result)
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.delete_backup(&name).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
