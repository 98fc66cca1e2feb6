use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use vitals_api::models::*;

use crate::errors::{ApiError, ReadingError};
use crate::services::AlertService;

#[derive(Clone)]
pub struct AlertState {
    pub alert_service: Arc<AlertService>,
}

pub fn alert_router(alert_state: AlertState) -> Router {
    Router::new()
        .route("/api/alerts", get(get_alerts))
        .with_state(alert_state)
}

#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "alerts",
    params(AlertsQuery),
    responses(
        (status = 200, description = "Alerts, newest first", body = AlertsResponse),
        (status = 400, description = "Invalid or malformed limit"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn get_alerts(
    State(state): State<AlertState>,
    query: Result<Query<AlertsQuery>, QueryRejection>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let Query(query) = query.map_err(ReadingError::from)?;

    let alerts = state.alert_service.list(query.limit).await?;

    Ok(Json(AlertsResponse {
        count: alerts.len(),
        alerts,
    }))
}
