use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::sync::broadcast::{self, Sender};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::{Analysis, SchemaManager, Settings, Storage};
use crate::handles::*;
use crate::repositories::{AlertRepository, AnalysisRepository, ReadingRepository};
use crate::services::*;

/// Long lived handles shared by the routers and the simulator task.
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<Storage>,
    pub sender: Sender<ServiceEvent>,
    pub monitor: Arc<DeviceMonitor>,
    pub simulator_control: SimulatorControl,
    pub reading_repository: Arc<ReadingRepository>,
    pub alert_repository: Arc<AlertRepository>,
    pub analysis_repository: Arc<AnalysisRepository>,
    pub ingest_service: Arc<IngestService>,
    pub query_service: Arc<QueryService>,
    pub alert_service: Arc<AlertService>,
    pub analysis_service: Arc<AnalysisService>,
}

impl AppContext {
    pub fn new(
        settings: &Settings,
        storage: Arc<Storage>,
        model: Option<Arc<dyn AnalysisModel>>,
    ) -> Self {
        let (sender, _receiver) = broadcast::channel(100);

        let monitor = Arc::new(DeviceMonitor::new(
            settings.simulator.device_id.clone(),
            settings.ingest.recency_window(),
        ));
        let simulator_control = SimulatorControl::new(settings.simulator.enabled);

        let reading_repository = Arc::new(ReadingRepository::new(storage.clone()));
        let alert_repository = Arc::new(AlertRepository::new(storage.clone()));
        let analysis_repository = Arc::new(AnalysisRepository::new(storage.clone()));

        let ingest_service = Arc::new(IngestService::new(
            reading_repository.clone(),
            monitor.clone(),
            sender.clone(),
            settings.ingest.clone(),
        ));
        let query_service = Arc::new(QueryService::new(reading_repository.clone()));
        let alert_service = Arc::new(AlertService::new(
            alert_repository.clone(),
            sender.clone(),
            settings.alerting.thresholds.clone(),
        ));
        let analysis_service = Arc::new(AnalysisService::new(
            query_service.clone(),
            alert_service.clone(),
            analysis_repository.clone(),
            model,
            settings.analysis.timeout(),
        ));

        Self {
            storage,
            sender,
            monitor,
            simulator_control,
            reading_repository,
            alert_repository,
            analysis_repository,
            ingest_service,
            query_service,
            alert_service,
            analysis_service,
        }
    }

    pub fn simulator(&self, settings: &Settings) -> SimulatorService {
        SimulatorService::new(
            self.ingest_service.clone(),
            self.monitor.clone(),
            self.simulator_control.clone(),
            settings.simulator.clone(),
        )
    }
}

pub fn create_router(context: &AppContext) -> Router {
    Router::new()
        .merge(esp32_router(Esp32State {
            ingest_service: context.ingest_service.clone(),
            reading_repository: context.reading_repository.clone(),
            monitor: context.monitor.clone(),
        }))
        .merge(vital_sign_router(VitalSignState {
            query_service: context.query_service.clone(),
            ingest_service: context.ingest_service.clone(),
        }))
        .merge(alert_router(AlertState {
            alert_service: context.alert_service.clone(),
        }))
        .merge(analysis_router(AnalysisState {
            analysis_service: context.analysis_service.clone(),
        }))
        .merge(system_router(SystemState {
            storage: context.storage.clone(),
            reading_repository: context.reading_repository.clone(),
            alert_repository: context.alert_repository.clone(),
            analysis_repository: context.analysis_repository.clone(),
            monitor: context.monitor.clone(),
            simulator_control: context.simulator_control.clone(),
        }))
        .merge(sse_router(SSEState {
            sender: context.sender.clone(),
        }))
        .merge(openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app(settings: &Arc<Settings>) -> anyhow::Result<Router> {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .with_context(|| format!("failed to open database {}", settings.database.url))?,
    );

    let context = AppContext::new(settings, storage, build_model(&settings.analysis));

    Arc::new(context.simulator(settings)).start();

    Ok(create_router(&context))
}

fn build_model(settings: &Analysis) -> Option<Arc<dyn AnalysisModel>> {
    if !settings.enabled {
        return None;
    }

    match GeminiModel::new(settings) {
        Ok(model) => {
            tracing::info!(model = %settings.model, "analysis model enabled");
            Some(Arc::new(model))
        }
        Err(e) => {
            tracing::warn!("analysis model disabled: {}", e);
            None
        }
    }
}
