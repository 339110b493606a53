//! Route handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::AppState;
use crate::domain::entry::{Entry, ModifyRequest, NewEntry};
use crate::domain::error::PanelError;
use crate::domain::response::ApiResponse;

const WELCOME: &str =
    "Welcome to Snell Panel. Please use the API to manage the entries.\n https://github.com/missuo/snell-panel";

pub async fn welcome() -> Json<ApiResponse> {
    Json(ApiResponse::success(WELCOME))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "version": crate::VERSION }))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("Path not found")),
    )
        .into_response()
}

pub async fn insert_entry(
    State(state): State<AppState>,
    payload: Result<Json<NewEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Entry>>), PanelError> {
    let Json(request) = payload?;
    let entry = state.service.insert_entry(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Entry created successfully").with_data(entry)),
    ))
}

pub async fn list_entries(State(state): State<AppState>) -> Result<Response, PanelError> {
    let entries = state.service.list_entries().await?;
    if entries.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::warning("No entries found")),
        )
            .into_response());
    }
    Ok(Json(ApiResponse::success("Entries retrieved successfully").with_data(entries)).into_response())
}

pub async fn delete_by_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<Json<ApiResponse>, PanelError> {
    let removed = state.service.delete_by_ip(&ip).await?;
    Ok(Json(
        ApiResponse::success("Entry deleted successfully")
            .with_data(serde_json::json!({ "deleted": removed })),
    ))
}

pub async fn delete_by_node_id(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<ApiResponse>, PanelError> {
    state.service.delete_by_node_id(&node_id).await?;
    Ok(Json(ApiResponse::success("Entry deleted successfully")))
}

pub async fn modify_by_node_id(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    payload: Result<Json<ModifyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, PanelError> {
    let Json(request) = payload?;
    state.service.modify_by_node_id(&node_id, request).await?;
    Ok(Json(ApiResponse::success("Node updated successfully")))
}

/// Plain-text subscription document.
pub async fn subscribe(State(state): State<AppState>) -> Result<String, PanelError> {
    state.service.subscription().await
}
