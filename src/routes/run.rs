use super::error_response;
use crate::services::{AppState, ServerOverview};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use launcher::LauncherResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

const DEFAULT_TAIL_LINES: usize = 200;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Deserialize, Default)]
pub(crate) struct StopRequest {
    #[serde(default)]
    force: bool,
}

#[derive(Serialize)]
pub(crate) struct StopResponse {
    outcome: launcher::runner::StopOutcome,
    status: ServerOverview,
}

#[derive(Deserialize)]
pub(crate) struct CommandRequest {
    command: String,
}

#[derive(Serialize)]
pub(crate) struct LogTailResponse {
    lines: Vec<String>,
}

fn flatten<T>(joined: LauncherResult<LauncherResult<T>>) -> LauncherResult<T> {
    joined.and_then(|result| result)
}

pub async fn run_status(State(state): State<AppState>) -> ApiResult<ServerOverview> {
    Ok(Json(state.overview().await))
}

pub async fn run_start(State(state): State<AppState>) -> ApiResult<ServerOverview> {
    flatten(state.start().join().await).map_err(error_response)?;
    Ok(Json(state.overview().await))
}

pub async fn run_stop(
    State(state): State<AppState>,
    request: Option<Json<StopRequest>>,
) -> ApiResult<StopResponse> {
    let force = request.map(|Json(request)| request.force).unwrap_or(false);
    let outcome = flatten(state.stop(force).join().await).map_err(error_response)?;
    Ok(Json(StopResponse {
        outcome,
        status: state.overview().await,
    }))
}

pub async fn run_restart(State(state): State<AppState>) -> ApiResult<ServerOverview> {
    flatten(state.restart().join().await).map_err(error_response)?;
    Ok(Json(state.overview().await))
}

pub async fn run_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let command = request.command.trim();
    if command.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "command is empty".to_string()));
    }
    state
        .runner
        .send_command(command)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn run_logs_tail(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<LogTailResponse> {
    let limit = params
        .get("n")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TAIL_LINES);
    let mut lines = state.runner.tail(limit).await;
    if lines.is_empty() {
        lines = state.runner.tail_persisted(limit).await;
    }
    Ok(Json(LogTailResponse { lines }))
}

pub async fn run_logs_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let receiver = state.runner.subscribe();
    let stream = BroadcastStream::new(receiver)
        .filter_map(|message| message.ok())
        .map(|line| Ok(Event::default().data(line)));
    Sse::new(stream)
}
