use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use time::OffsetDateTime;
use vitals_api::models::*;

use crate::configs::Storage;
use crate::errors::ApiError;
use crate::repositories::{AlertRepository, AnalysisRepository, ReadingRepository};
use crate::services::{DeviceMonitor, SimulatorControl};

#[derive(Clone)]
pub struct SystemState {
    pub storage: Arc<Storage>,
    pub reading_repository: Arc<ReadingRepository>,
    pub alert_repository: Arc<AlertRepository>,
    pub analysis_repository: Arc<AnalysisRepository>,
    pub monitor: Arc<DeviceMonitor>,
    pub simulator_control: SimulatorControl,
}

pub fn system_router(system_state: SystemState) -> Router {
    Router::new()
        .route("/api/", get(get_root))
        .route("/api/health", get(get_health))
        .route("/api/data/cleanup", post(cleanup_data))
        .route("/api/simulation/start", post(start_simulation))
        .route("/api/simulation/stop", post(stop_simulation))
        .with_state(system_state)
}

#[utoipa::path(
    get,
    path = "/api/",
    tag = "system",
    responses(
        (status = 200, description = "Service banner", body = MessageResponse)
    )
)]
pub async fn get_root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("Vitals monitor API {}", env!("CARGO_PKG_VERSION")),
    })
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<SystemState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, database) = match state.storage.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "connected"),
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
        }
    };

    let simulation = if state.simulator_control.is_active() {
        "active"
    } else {
        "inactive"
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            database: database.to_string(),
            simulation: simulation.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }),
    )
}

#[utoipa::path(
    post,
    path = "/api/data/cleanup",
    tag = "system",
    responses(
        (status = 200, description = "All readings, alerts and analyses deleted", body = CleanupResponse),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn cleanup_data(
    State(state): State<SystemState>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let mut tx = state.storage.get_pool().begin().await?;

    let readings = state.reading_repository.delete_all(&mut tx).await?;
    let alerts = state.alert_repository.delete_all(&mut tx).await?;
    let analyses = state.analysis_repository.delete_all(&mut tx).await?;

    tx.commit().await?;

    state.monitor.reset().await;

    tracing::warn!(readings, alerts, analyses, "all recorded data deleted");

    Ok(Json(CleanupResponse {
        message: String::from("All data deleted"),
        deleted_documents: readings + alerts + analyses,
    }))
}

#[utoipa::path(
    post,
    path = "/api/simulation/start",
    tag = "system",
    responses(
        (status = 200, description = "Simulator enabled", body = SimulationResponse)
    )
)]
pub async fn start_simulation(State(state): State<SystemState>) -> Json<SimulationResponse> {
    state.simulator_control.start();
    tracing::info!("simulator enabled by operator");

    Json(SimulationResponse {
        message: String::from("Simulation started"),
        active: true,
    })
}

#[utoipa::path(
    post,
    path = "/api/simulation/stop",
    tag = "system",
    responses(
        (status = 200, description = "Simulator paused", body = SimulationResponse)
    )
)]
pub async fn stop_simulation(State(state): State<SystemState>) -> Json<SimulationResponse> {
    state.simulator_control.stop();
    tracing::info!("simulator paused by operator");

    Json(SimulationResponse {
        message: String::from("Simulation stopped"),
        active: false,
    })
}
