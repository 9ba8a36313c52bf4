//! Request handlers.
//!
//! Each handler translates one route into a single storage call and
//! serializes the result. Errors become [`ApiError`] responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use registry_core::{ServerCount, ServerRecord};
use serde::{Deserialize, Serialize};

use crate::config::{Environment, LogLevel, StorageType};
use crate::error::ApiError;
use crate::server::AppState;
use crate::APP_VERSION;

// =============================================================================
// Response Bodies
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerListResponse {
    pub servers: Vec<ServerRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub servers: Vec<ServerRecord>,
    pub count: usize,
    pub search_term: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    name: Option<String>,
}

/// Configuration subset safe to expose in development.
#[derive(Debug, Serialize)]
pub struct DebugConfigResponse {
    environment: Environment,
    address: String,
    log_level: LogLevel,
    storage_type: StorageType,
    backend: &'static str,
    seed: bool,
    version: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn list_servers(
    State(state): State<AppState>,
) -> Result<Json<ServerListResponse>, ApiError> {
    let servers = state
        .store
        .get_all()
        .await
        .map_err(ApiError::storage("Failed to retrieve servers"))?;

    Ok(Json(ServerListResponse {
        count: servers.len(),
        servers,
    }))
}

pub async fn create_server(
    State(state): State<AppState>,
    payload: Result<Json<ServerRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<ServerRecord>), ApiError> {
    let Json(server) = payload?;

    let stored = state
        .store
        .create(server)
        .await
        .map_err(ApiError::storage("Failed to create server"))?;

    tracing::info!(id = %stored.id, name = %stored.name, "registered server");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServerRecord>, ApiError> {
    let server = state
        .store
        .get_by_id(&id)
        .await
        .map_err(ApiError::storage("Failed to retrieve server"))?;

    Ok(Json(server))
}

/// The path id wins over any id in the body.
pub async fn update_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ServerRecord>, JsonRejection>,
) -> Result<Json<ServerRecord>, ApiError> {
    let Json(mut server) = payload?;
    server.id = id;

    let stored = state
        .store
        .update(server)
        .await
        .map_err(ApiError::storage("Failed to update server"))?;

    tracing::info!(id = %stored.id, "updated server");
    Ok(Json(stored))
}

pub async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete(&id)
        .await
        .map_err(ApiError::storage("Failed to delete server"))?;

    tracing::info!(%id, "deleted server");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn count_servers(State(state): State<AppState>) -> Result<Json<ServerCount>, ApiError> {
    let count = state
        .store
        .count()
        .await
        .map_err(ApiError::storage("Failed to get server count"))?;

    Ok(Json(count))
}

pub async fn search_servers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let search_term = params
        .name
        .filter(|name| !name.is_empty())
        .ok_or(ApiError::MissingParameter("Search term 'name' is required"))?;

    let servers = state
        .store
        .search(&search_term)
        .await
        .map_err(ApiError::storage("Failed to search servers"))?;

    Ok(Json(SearchResponse {
        count: servers.len(),
        servers,
        search_term,
    }))
}

pub async fn debug_config(State(state): State<AppState>) -> Json<DebugConfigResponse> {
    let config = &state.config;
    Json(DebugConfigResponse {
        environment: config.environment,
        address: config.address(),
        log_level: config.log_level,
        storage_type: config.storage_type,
        backend: state.store.backend_name(),
        seed: !config.no_seed,
        version: APP_VERSION,
    })
}
