use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use vitals_api::models::*;

use crate::errors::ApiError;
use crate::services::AnalysisService;

#[derive(Clone)]
pub struct AnalysisState {
    pub analysis_service: Arc<AnalysisService>,
}

pub fn analysis_router(analysis_state: AnalysisState) -> Router {
    Router::new()
        .route("/api/analysis/run", post(run_analysis))
        .route("/api/analysis/latest", get(get_latest_analysis))
        .with_state(analysis_state)
}

#[utoipa::path(
    post,
    path = "/api/analysis/run",
    tag = "analysis",
    responses(
        (status = 200, description = "Analysis finished, `no_data` when nothing has been recorded", body = RunAnalysisResponse),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn run_analysis(
    State(state): State<AnalysisState>,
) -> Result<Json<RunAnalysisResponse>, ApiError> {
    Ok(Json(state.analysis_service.run().await?))
}

#[utoipa::path(
    get,
    path = "/api/analysis/latest",
    tag = "analysis",
    responses(
        (status = 200, description = "Most recent analysis", body = Analysis),
        (status = 404, description = "No analysis has been run"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn get_latest_analysis(
    State(state): State<AnalysisState>,
) -> Result<Json<Analysis>, ApiError> {
    Ok(Json(state.analysis_service.latest().await?))
}
