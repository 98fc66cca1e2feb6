use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;
use vitals_api::models::*;

use super::*;

#[derive(OpenApi)]
#[openapi(
    info(title = "Vitals Monitor API"),
    paths(
        receive_esp32_data,
        get_esp32_status,
        get_latest_vital_signs,
        get_vital_signs,
        create_vital_sign,
        get_alerts,
        run_analysis,
        get_latest_analysis,
        get_root,
        get_health,
        cleanup_data,
        start_simulation,
        stop_simulation,
        sse_handler,
    ),
    components(schemas(
        SensorType,
        Reading,
        SensorValues,
        Esp32DataRequest,
        CreateReadingRequest,
        IngestResponse,
        VitalSignsResponse,
        Esp32StatusResponse,
        DeviceStatus,
        AlertLevel,
        Alert,
        AlertsResponse,
        HealthStatus,
        AnalysisSource,
        Analysis,
        RunAnalysisResponse,
        MessageResponse,
        HealthResponse,
        SimulationResponse,
        CleanupResponse,
    )),
    tags(
        (name = "esp32", description = "Physical device ingestion"),
        (name = "vital-signs", description = "Latest readings and history"),
        (name = "alerts", description = "Threshold alerts"),
        (name = "analysis", description = "Health analysis"),
        (name = "system", description = "Health, maintenance and simulator control"),
        (name = "events", description = "Live push channel")
    )
)]
pub struct ApiDoc;

pub fn openapi_router() -> Router {
    Router::new().route("/api/openapi.json", get(get_openapi))
}

pub async fn get_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
