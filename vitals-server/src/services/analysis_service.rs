use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use time::OffsetDateTime;
use vitals_api::{Alert, AlertLevel, Analysis, AnalysisSource, HealthStatus, LatestReadings, RunAnalysisResponse};

use crate::configs::Analysis as AnalysisSettings;
use crate::errors::{AnalysisError, ApiError, ModelError};
use crate::models::{AlertRecord, AnalysisRecord, to_millis};
use crate::repositories::AnalysisRepository;
use crate::services::{AlertService, QueryService};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelVerdict {
    pub status: HealthStatus,
    pub narrative: String,
}

/// External assessment of a snapshot.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    async fn assess(&self, snapshot: &LatestReadings) -> Result<ModelVerdict, ModelError>;
}

/// Client for a Gemini compatible `generateContent` endpoint.
pub struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiModel {
    pub fn new(settings: &AnalysisSettings) -> Result<Self, ModelError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(ModelError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl AnalysisModel for GeminiModel {
    async fn assess(&self, snapshot: &LatestReadings) -> Result<ModelVerdict, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(snapshot) }] }]
        });

        let response: Value = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        Ok(ModelVerdict {
            status: classify_answer(text)?,
            narrative: text.to_string(),
        })
    }
}

pub fn build_prompt(snapshot: &LatestReadings) -> String {
    let mut prompt = String::from(
        "You are assisting a vital signs monitor. Assess these latest readings:\n",
    );

    for reading in snapshot.values() {
        prompt.push_str(&format!(
            "- {}: {} {}\n",
            reading.sensor_type.label(),
            reading.value,
            reading.unit
        ));
    }

    prompt.push_str(
        "Start your answer with exactly one word, NORMAL, ATTENTION or CRITICAL, \
         followed by a short explanation.",
    );

    prompt
}

/// Status named by the leading word of the answer. When the answer does not lead
/// with a status word, the most severe keyword anywhere in it is used.
pub fn classify_answer(text: &str) -> Result<HealthStatus, ModelError> {
    let leading = text
        .split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .and_then(status_keyword);

    if let Some(status) = leading {
        return Ok(status);
    }

    let upper = text.to_uppercase();

    if upper.contains("CRITICAL") {
        Ok(HealthStatus::Critical)
    } else if upper.contains("ATTENTION") {
        Ok(HealthStatus::Attention)
    } else if upper.contains("NORMAL") {
        Ok(HealthStatus::Normal)
    } else {
        Err(ModelError::UnrecognizedAnswer(text.chars().take(80).collect()))
    }
}

fn status_keyword(word: &str) -> Option<HealthStatus> {
    match word.to_uppercase().as_str() {
        "NORMAL" => Some(HealthStatus::Normal),
        "ATTENTION" => Some(HealthStatus::Attention),
        "CRITICAL" => Some(HealthStatus::Critical),
        _ => None,
    }
}

pub struct AnalysisService {
    query_service: Arc<QueryService>,
    alert_service: Arc<AlertService>,
    analysis_repository: Arc<AnalysisRepository>,
    model: Option<Arc<dyn AnalysisModel>>,
    timeout: Duration,
}

impl AnalysisService {
    pub fn new(
        query_service: Arc<QueryService>,
        alert_service: Arc<AlertService>,
        analysis_repository: Arc<AnalysisRepository>,
        model: Option<Arc<dyn AnalysisModel>>,
        timeout: Duration,
    ) -> Self {
        Self {
            query_service,
            alert_service,
            analysis_repository,
            model,
            timeout,
        }
    }

    pub async fn run(&self) -> Result<RunAnalysisResponse, ApiError> {
        let snapshot = self.query_service.latest().await?;
        if snapshot.is_empty() {
            return Ok(RunAnalysisResponse {
                message: String::from("No vital signs available for analysis"),
                analysis_id: None,
                health_status: HealthStatus::NoData,
                alerts_generated: 0,
            });
        }

        let now = OffsetDateTime::now_utc();
        let timestamp_ms = to_millis(now);

        let violations = self.alert_service.evaluate(&snapshot);
        let rule_status = HealthStatus::from_alert_level(violations.iter().map(|v| v.level).max());

        let mut records: Vec<AlertRecord> = violations
            .iter()
            .map(|violation| violation.to_record(timestamp_ms))
            .collect();

        let verdict = self.consult_model(&snapshot).await;
        if let Some(verdict) = &verdict {
            if let Some(record) = model_alert(verdict, timestamp_ms) {
                records.push(record);
            }
        }

        let health_status = verdict
            .as_ref()
            .map_or(rule_status, |verdict| rule_status.max(verdict.status));
        let source = if verdict.is_some() {
            AnalysisSource::Model
        } else {
            AnalysisSource::Rules
        };
        let summary = match &verdict {
            Some(verdict) => verdict.narrative.clone(),
            None => rules_summary(snapshot.len(), violations.len(), health_status),
        };

        let mut tx = self.analysis_repository.get_pool().begin().await?;

        let mut alerts: Vec<Alert> = Vec::with_capacity(records.len());
        for record in records {
            alerts.push(self.alert_service.create(record, &mut tx).await?);
        }

        let analysis_id = self
            .analysis_repository
            .create(
                &AnalysisRecord {
                    id: 0,
                    health_status: health_status.to_string(),
                    summary,
                    source: source.as_str().to_string(),
                    alerts_generated: alerts.len() as i64,
                    timestamp_ms,
                },
                &mut tx,
            )
            .await?;

        tx.commit().await?;

        self.alert_service.publish(&alerts);

        tracing::info!(
            analysis_id,
            %health_status,
            alerts = alerts.len(),
            source = source.as_str(),
            "analysis completed"
        );

        Ok(RunAnalysisResponse {
            message: String::from("Analysis completed"),
            analysis_id: Some(analysis_id),
            health_status,
            alerts_generated: alerts.len(),
        })
    }

    pub async fn latest(&self) -> Result<Analysis, ApiError> {
        let analysis = self
            .analysis_repository
            .find_latest()
            .await?
            .ok_or(AnalysisError::AnalysisNotFound)?;

        Ok(analysis.into())
    }

    /// Model failures only cost the model's opinion, never the analysis.
    async fn consult_model(&self, snapshot: &LatestReadings) -> Option<ModelVerdict> {
        let model = self.model.as_ref()?;

        let result = match tokio::time::timeout(self.timeout, model.assess(snapshot)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout),
        };

        match result {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                tracing::warn!("analysis model unavailable, using rules only: {}", e);
                None
            }
        }
    }
}

fn model_alert(verdict: &ModelVerdict, timestamp_ms: i64) -> Option<AlertRecord> {
    let level = match verdict.status {
        HealthStatus::Critical => AlertLevel::Critical,
        HealthStatus::Attention => AlertLevel::Warning,
        HealthStatus::Normal | HealthStatus::NoData => return None,
    };

    Some(AlertRecord {
        id: 0,
        level: level.to_string(),
        title: format!("Model assessment: {}", verdict.status),
        message: verdict.narrative.clone(),
        timestamp_ms,
        sensor_type: None,
        trigger_value: None,
        normal_range: None,
    })
}

fn rules_summary(readings: usize, violations: usize, status: HealthStatus) -> String {
    match violations {
        0 => format!("All {readings} latest readings are within their normal ranges"),
        _ => format!("{violations} of {readings} latest readings are out of range, status {status}"),
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;
    use vitals_api::SensorType;

    use crate::configs::Thresholds;
    use crate::repositories::{AlertRepository, ReadingRepository};
    use crate::tests::*;

    use super::*;

    struct ScriptedModel(HealthStatus);

    #[async_trait]
    impl AnalysisModel for ScriptedModel {
        async fn assess(&self, _: &LatestReadings) -> Result<ModelVerdict, ModelError> {
            Ok(ModelVerdict {
                status: self.0,
                narrative: format!("{} per scripted model", self.0),
            })
        }
    }

    struct FailingModel;

    #[async_trait]
    impl AnalysisModel for FailingModel {
        async fn assess(&self, _: &LatestReadings) -> Result<ModelVerdict, ModelError> {
            Err(ModelError::EmptyResponse)
        }
    }

    struct StalledModel;

    #[async_trait]
    impl AnalysisModel for StalledModel {
        async fn assess(&self, _: &LatestReadings) -> Result<ModelVerdict, ModelError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ModelError::Timeout)
        }
    }

    async fn setup_service(
        model: Option<Arc<dyn AnalysisModel>>,
    ) -> (AnalysisService, Arc<crate::configs::Storage>) {
        let storage = setup_test_db().await;
        let (sender, _) = broadcast::channel(16);

        let query_service = Arc::new(QueryService::new(Arc::new(ReadingRepository::new(storage.clone()))));
        let alert_service = Arc::new(AlertService::new(
            Arc::new(AlertRepository::new(storage.clone())),
            sender,
            Thresholds::default(),
        ));

        let service = AnalysisService::new(
            query_service,
            alert_service,
            Arc::new(AnalysisRepository::new(storage.clone())),
            model,
            Duration::from_millis(200),
        );

        (service, storage)
    }

    #[test]
    fn test_classify_answer() {
        assert_eq!(classify_answer("NORMAL. All fine.").unwrap(), HealthStatus::Normal);
        assert_eq!(classify_answer("Attention: pulse is high").unwrap(), HealthStatus::Attention);
        assert_eq!(classify_answer("CRITICAL - call someone").unwrap(), HealthStatus::Critical);
        assert!(classify_answer("I cannot tell").is_err());
    }

    #[test]
    fn test_classify_answer_trusts_leading_word() {
        assert_eq!(
            classify_answer("NORMAL. All readings are in range, nothing critical.").unwrap(),
            HealthStatus::Normal
        );
        assert_eq!(
            classify_answer("  **Attention**: not critical yet, but SpO2 is dropping").unwrap(),
            HealthStatus::Attention
        );
        assert_eq!(
            classify_answer("The readings look critical, heart rate is 170").unwrap(),
            HealthStatus::Critical
        );
    }

    #[test]
    fn test_prompt_lists_readings() {
        let mut snapshot = LatestReadings::new();
        snapshot.insert(
            SensorType::HeartRate,
            vitals_api::Reading {
                id: 1,
                sensor_type: SensorType::HeartRate,
                value: 88.0,
                unit: "bpm".to_string(),
                timestamp: OffsetDateTime::now_utc(),
                device_id: "esp32_real".to_string(),
            },
        );

        let prompt = build_prompt(&snapshot);
        assert!(prompt.contains("- Heart rate: 88 bpm"));
        assert!(prompt.contains("NORMAL, ATTENTION or CRITICAL"));
    }

    #[tokio::test]
    async fn test_run_without_data_persists_nothing() {
        let (service, _) = setup_service(None).await;

        let response = service.run().await.unwrap();

        assert_eq!(response.health_status, HealthStatus::NoData);
        assert_eq!(response.analysis_id, None);
        assert!(matches!(
            service.latest().await,
            Err(ApiError::AnalysisError(AnalysisError::AnalysisNotFound))
        ));
    }

    #[tokio::test]
    async fn test_rules_only_analysis() {
        let (service, storage) = setup_service(None).await;
        let now = OffsetDateTime::now_utc();
        create_test_reading(storage.clone(), SensorType::HeartRate, 165.0, "esp32_real", now).await;
        create_test_reading(storage.clone(), SensorType::Temperature, 36.6, "esp32_real", now).await;

        let response = service.run().await.unwrap();

        assert_eq!(response.health_status, HealthStatus::Critical);
        assert_eq!(response.alerts_generated, 1);

        let latest = service.latest().await.unwrap();
        assert_eq!(Some(latest.id), response.analysis_id);
        assert_eq!(latest.source, AnalysisSource::Rules);
        assert_eq!(latest.alerts_generated, 1);
    }

    #[tokio::test]
    async fn test_model_escalates_status_and_adds_alert() {
        let (service, storage) =
            setup_service(Some(Arc::new(ScriptedModel(HealthStatus::Attention)))).await;
        create_test_reading(storage.clone(), SensorType::HeartRate, 75.0, "esp32_real", OffsetDateTime::now_utc()).await;

        let response = service.run().await.unwrap();

        assert_eq!(response.health_status, HealthStatus::Attention);
        assert_eq!(response.alerts_generated, 1);
        assert_eq!(service.latest().await.unwrap().source, AnalysisSource::Model);
    }

    #[tokio::test]
    async fn test_model_cannot_lower_rule_status() {
        let (service, storage) =
            setup_service(Some(Arc::new(ScriptedModel(HealthStatus::Normal)))).await;
        create_test_reading(storage.clone(), SensorType::HeartRate, 165.0, "esp32_real", OffsetDateTime::now_utc()).await;

        let response = service.run().await.unwrap();

        assert_eq!(response.health_status, HealthStatus::Critical);
        assert_eq!(response.alerts_generated, 1);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_rules() {
        let (service, storage) = setup_service(Some(Arc::new(FailingModel))).await;
        create_test_reading(storage.clone(), SensorType::HeartRate, 125.0, "esp32_real", OffsetDateTime::now_utc()).await;

        let response = service.run().await.unwrap();

        assert_eq!(response.health_status, HealthStatus::Attention);
        assert_eq!(response.alerts_generated, 1);
        assert_eq!(service.latest().await.unwrap().source, AnalysisSource::Rules);
    }

    #[tokio::test]
    async fn test_model_timeout_falls_back_to_rules() {
        let (service, storage) = setup_service(Some(Arc::new(StalledModel))).await;
        create_test_reading(storage.clone(), SensorType::Gsr, 400.0, "esp32_real", OffsetDateTime::now_utc()).await;

        let response = service.run().await.unwrap();

        assert_eq!(response.health_status, HealthStatus::Normal);
        assert_eq!(response.alerts_generated, 0);
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let settings = AnalysisSettings {
            enabled: true,
            api_key: None,
            ..AnalysisSettings::default()
        };

        assert!(matches!(GeminiModel::new(&settings), Err(ModelError::NotConfigured)));
    }
}
