//! Health check endpoint handlers.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub runtime: RuntimeHealth,
    pub infrastructure: InfrastructureHealth,
}

/// Container runtime health status.
#[derive(Debug, Serialize)]
pub struct RuntimeHealth {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Presence of the shared resources.
#[derive(Debug, Serialize)]
pub struct InfrastructureHealth {
    pub network: bool,
    pub database: bool,
    pub application: bool,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health check endpoint.
///
/// Reports whether the container runtime answers and which shared
/// resources exist. Missing resources are normal before the first shop.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let version = state
        .runtime
        .version()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(format!("Container runtime unreachable: {}", e)))?;
    let docker = &state.config.docker;

    let infrastructure = InfrastructureHealth {
        network: state.runtime.network_exists(&docker.network).await.unwrap_or(false),
        database: state
            .runtime
            .container_exists(&docker.db_container)
            .await
            .unwrap_or(false),
        application: state
            .runtime
            .container_exists(&docker.app_container)
            .await
            .unwrap_or(false),
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        runtime: RuntimeHealth {
            reachable: true,
            version: Some(version),
        },
        infrastructure,
    }))
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the container runtime answers a version query.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    match state.runtime.version().await {
        Ok(_) => Ok(Json(StatusResponse {
            status: "ready".to_string(),
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Container runtime unreachable");
            Err(ApiError::ServiceUnavailable(
                "Container runtime unreachable".to_string(),
            ))
        }
    }
}
