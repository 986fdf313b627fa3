use super::error_response;
use crate::services::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use launcher::{
    cores::{self, Identification},
    mirrors,
    models::{CoreType, ServerProfile},
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub(crate) struct CoreRequest {
    core_type: CoreType,
    version: String,
    #[serde(default)]
    build: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct DetectResponse {
    identification: Identification,
    profile: ServerProfile,
}

#[derive(Serialize)]
pub(crate) struct UrlResponse {
    url: Option<String>,
    website: &'static str,
}

#[derive(Serialize)]
pub(crate) struct DownloadResponse {
    file_name: String,
    profile: ServerProfile,
}

pub async fn profile(State(state): State<AppState>) -> Json<ServerProfile> {
    Json(state.profile().await)
}

pub async fn detect(
    State(state): State<AppState>,
) -> Result<Json<DetectResponse>, (StatusCode, String)> {
    let (profile, identification) = state.detect().await.map_err(error_response)?;
    Ok(Json(DetectResponse {
        identification,
        profile,
    }))
}

pub async fn resolve_url(
    State(state): State<AppState>,
    Query(request): Query<CoreRequest>,
) -> Json<UrlResponse> {
    let mirror = state.profile().await.mirror_site;
    let url = mirrors::resolve(
        request.core_type,
        &request.version,
        mirror,
        request.build.as_deref(),
    );
    Json(UrlResponse {
        url,
        website: cores::describe(request.core_type).website,
    })
}

pub async fn download(
    State(state): State<AppState>,
    Json(request): Json<CoreRequest>,
) -> Result<Json<DownloadResponse>, (StatusCode, String)> {
    let file_name = state
        .download(request.core_type, &request.version, request.build.as_deref())
        .await
        .map_err(error_response)?;
    Ok(Json(DownloadResponse {
        file_name,
        profile: state.profile().await,
    }))
}

pub async fn accept_license(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.accept_license().await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
