use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use time::OffsetDateTime;
use vitals_api::models::*;

use crate::errors::{ApiError, ReadingError};
use crate::services::{IngestService, QueryService};

#[derive(Clone)]
pub struct VitalSignState {
    pub query_service: Arc<QueryService>,
    pub ingest_service: Arc<IngestService>,
}

pub fn vital_sign_router(vital_sign_state: VitalSignState) -> Router {
    Router::new()
        .route("/api/vital-signs", get(get_vital_signs).post(create_vital_sign))
        .route("/api/vital-signs/latest", get(get_latest_vital_signs))
        .with_state(vital_sign_state)
}

#[utoipa::path(
    get,
    path = "/api/vital-signs/latest",
    tag = "vital-signs",
    responses(
        (status = 200, description = "Newest reading per sensor type, keyed by sensor type", body = BTreeMap<String, Reading>),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn get_latest_vital_signs(
    State(state): State<VitalSignState>,
) -> Result<Json<LatestReadings>, ApiError> {
    Ok(Json(state.query_service.latest().await?))
}

#[utoipa::path(
    get,
    path = "/api/vital-signs",
    tag = "vital-signs",
    params(VitalSignsQuery),
    responses(
        (status = 200, description = "Readings of the window, newest first", body = VitalSignsResponse),
        (status = 400, description = "Invalid limit or hours"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn get_vital_signs(
    State(state): State<VitalSignState>,
    query: Result<Query<VitalSignsQuery>, QueryRejection>,
) -> Result<Json<VitalSignsResponse>, ApiError> {
    let Query(query) = query.map_err(ReadingError::from)?;

    let history = state
        .query_service
        .history(query.limit, query.hours, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(VitalSignsResponse {
        count: history.readings.len(),
        vital_signs: history.readings,
        period_hours: history.hours,
    }))
}

#[utoipa::path(
    post,
    path = "/api/vital-signs",
    tag = "vital-signs",
    request_body = CreateReadingRequest,
    responses(
        (status = 200, description = "Reading stored", body = IngestResponse),
        (status = 400, description = "Invalid value"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn create_vital_sign(
    State(state): State<VitalSignState>,
    payload: Result<Json<CreateReadingRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(body) = payload.map_err(ReadingError::from)?;

    let outcome = state
        .ingest_service
        .ingest_one(
            body.sensor_type,
            body.value,
            body.device_id.as_deref(),
            body.timestamp.as_deref(),
        )
        .await?;

    Ok(Json(IngestResponse {
        message: String::from("Vital sign recorded"),
        readings_saved: outcome.readings.len(),
        timestamp: outcome.timestamp,
    }))
}
