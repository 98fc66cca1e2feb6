use std::sync::Arc;

use sqlx::{Sqlite, Transaction};
use tokio::sync::broadcast::Sender;
use vitals_api::{Alert, AlertLevel, LatestReadings, SensorType};

use crate::configs::{SensorThreshold, Thresholds};
use crate::errors::{ApiError, ReadingError};
use crate::models::AlertRecord;
use crate::repositories::AlertRepository;
use crate::services::ServiceEvent;

pub const DEFAULT_ALERT_LIMIT: i64 = 20;
pub const MAX_ALERT_LIMIT: i64 = 1000;

/// A latest reading that left one of its configured bands.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub sensor_type: SensorType,
    pub level: AlertLevel,
    pub value: f64,
    pub threshold: SensorThreshold,
}

impl Violation {
    pub fn to_record(&self, timestamp_ms: i64) -> AlertRecord {
        let label = self.sensor_type.label();
        let unit = self.sensor_type.unit();
        let (band_name, band) = match self.level {
            AlertLevel::Critical => ("critical", self.threshold.hard),
            AlertLevel::Warning => ("warning", self.threshold.soft),
            AlertLevel::Info => ("normal", self.threshold.normal.unwrap_or(self.threshold.soft)),
        };

        AlertRecord {
            id: 0,
            level: self.level.to_string(),
            title: format!("{label} {}", self.level),
            message: format!(
                "{label} of {} {unit} is outside the {band_name} range {}",
                self.value,
                format_band(band, unit)
            ),
            timestamp_ms,
            sensor_type: Some(self.sensor_type.to_string()),
            trigger_value: Some(self.value),
            normal_range: Some(format_band(
                self.threshold.normal.unwrap_or(self.threshold.soft),
                unit,
            )),
        }
    }
}

fn format_band((min, max): (f64, f64), unit: &str) -> String {
    format!("{min}-{max} {unit}")
}

/// Severity of a value against one sensor's bands, `None` when normal.
pub fn classify(value: f64, threshold: &SensorThreshold) -> Option<AlertLevel> {
    let outside = |(min, max): (f64, f64)| value < min || value > max;

    if outside(threshold.hard) {
        Some(AlertLevel::Critical)
    } else if outside(threshold.soft) {
        Some(AlertLevel::Warning)
    } else if threshold.normal.is_some_and(outside) {
        Some(AlertLevel::Info)
    } else {
        None
    }
}

pub fn evaluate(snapshot: &LatestReadings, thresholds: &Thresholds) -> Vec<Violation> {
    snapshot
        .values()
        .filter_map(|reading| {
            let threshold = thresholds.get(reading.sensor_type);

            classify(reading.value, threshold).map(|level| Violation {
                sensor_type: reading.sensor_type,
                level,
                value: reading.value,
                threshold: *threshold,
            })
        })
        .collect()
}

pub struct AlertService {
    alert_repository: Arc<AlertRepository>,
    sender: Sender<ServiceEvent>,
    thresholds: Thresholds,
}

impl AlertService {
    pub fn new(
        alert_repository: Arc<AlertRepository>,
        sender: Sender<ServiceEvent>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            alert_repository,
            sender,
            thresholds,
        }
    }

    pub fn evaluate(&self, snapshot: &LatestReadings) -> Vec<Violation> {
        evaluate(snapshot, &self.thresholds)
    }

    pub async fn create(
        &self,
        record: AlertRecord,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Alert, sqlx::Error> {
        let id = self.alert_repository.create(&record, transaction).await?;

        Ok(Alert::from(AlertRecord { id, ..record }))
    }

    /// Announces committed alerts to live subscribers.
    pub fn publish(&self, alerts: &[Alert]) {
        for alert in alerts {
            let _ = self.sender.send(ServiceEvent::AlertCreated(alert.clone()));
        }
    }

    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Alert>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_ALERT_LIMIT);
        if limit < 1 {
            return Err(ReadingError::InvalidLimit.into());
        }

        let alerts = self
            .alert_repository
            .find_latest(limit.min(MAX_ALERT_LIMIT))
            .await?;

        Ok(alerts.into_iter().map(Alert::from).collect())
    }
}
