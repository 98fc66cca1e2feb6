use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use time::OffsetDateTime;
use vitals_api::models::*;

use crate::errors::{ApiError, ReadingError};
use crate::repositories::ReadingRepository;
use crate::services::{DeviceMonitor, IngestService};

#[derive(Clone)]
pub struct Esp32State {
    pub ingest_service: Arc<IngestService>,
    pub reading_repository: Arc<ReadingRepository>,
    pub monitor: Arc<DeviceMonitor>,
}

pub fn esp32_router(esp32_state: Esp32State) -> Router {
    Router::new()
        .route("/api/esp32/data", post(receive_esp32_data))
        .route("/api/esp32/status", get(get_esp32_status))
        .with_state(esp32_state)
}

#[utoipa::path(
    post,
    path = "/api/esp32/data",
    tag = "esp32",
    request_body = Esp32DataRequest,
    responses(
        (status = 200, description = "Readings stored", body = IngestResponse),
        (status = 400, description = "No valid sensor field in payload"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn receive_esp32_data(
    State(state): State<Esp32State>,
    payload: Result<Json<Esp32DataRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(body) = payload.map_err(ReadingError::from)?;

    let outcome = state
        .ingest_service
        .ingest(
            &body.values,
            body.device_id.as_deref(),
            body.timestamp.as_deref(),
        )
        .await?;

    Ok(Json(IngestResponse {
        message: String::from("Data received successfully"),
        readings_saved: outcome.readings.len(),
        timestamp: outcome.timestamp,
    }))
}

#[utoipa::path(
    get,
    path = "/api/esp32/status",
    tag = "esp32",
    responses(
        (status = 200, description = "Connection state of the physical device", body = Esp32StatusResponse),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn get_esp32_status(
    State(state): State<Esp32State>,
) -> Result<Json<Esp32StatusResponse>, ApiError> {
    let checked_at = OffsetDateTime::now_utc();
    let status = state.monitor.status(checked_at).await;

    let last_reading = state
        .reading_repository
        .find_latest_excluding_device(state.monitor.simulated_device())
        .await?
        .map(Reading::from);

    Ok(Json(Esp32StatusResponse {
        connected: status.connected,
        last_reading,
        checked_at,
    }))
}
