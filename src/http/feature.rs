//! Feature configuration endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::http::response::{empty, empty_list, error_json};
use crate::http::server::AppState;
use crate::reconcile::{FeatureOverview, ReconcileError};

/// Marker accepted by the reload endpoint in place of a feature name.
pub const RELOAD_ALL: &str = "all";

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub config: Value,
}

pub async fn ping() -> &'static str {
    "Ping"
}

pub async fn control(
    State(state): State<AppState>,
    Json(request): Json<ControlRequest>,
) -> Response {
    match state.reconciler.set_enabled(&request.name, request.enabled).await {
        Ok(_) => empty(StatusCode::OK),
        Err(ReconcileError::NotFound(name)) => {
            tracing::debug!(feature = %name, "Enablement toggle for unknown feature");
            empty(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            tracing::error!(feature = %request.name, error = %e, "Failed to update feature enablement");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

pub async fn list_all(State(state): State<AppState>) -> Json<FeatureOverview> {
    Json(state.reconciler.list_all().await)
}

pub async fn get_config(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.reconciler.get_one(&id).await {
        Ok(config) => Json(config).into_response(),
        Err(e) => {
            tracing::warn!(feature = %id, error = %e, "Config lookup failed");
            empty_list()
        }
    }
}

pub async fn set_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ConfigUpdate>,
) -> StatusCode {
    match state.reconciler.set_config(&id, update.config).await {
        Ok(_) => StatusCode::OK,
        Err(ReconcileError::InvalidFeatureName(name)) => {
            tracing::warn!(feature = %name, "Rejected config for feature with unknown type prefix");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            tracing::error!(feature = %id, error = %e, "Failed to save feature config");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn reload(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if id == RELOAD_ALL {
        // Answers with the marker only. No feature is reloaded on this path.
        return RELOAD_ALL.into_response();
    }

    match state.reconciler.reload(&id).await {
        Ok(_) => empty(StatusCode::OK),
        Err(e) => {
            tracing::info!(feature = %id, error = %e, "Explicit reload failed");
            empty(StatusCode::NOT_FOUND)
        }
    }
}
