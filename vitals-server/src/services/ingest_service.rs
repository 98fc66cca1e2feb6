use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tokio::sync::broadcast::Sender;
use vitals_api::{Reading, SensorType, SensorValues};

use crate::configs::Ingest;
use crate::errors::{ApiError, ReadingError};
use crate::models::{ReadingRecord, to_millis, truncate_to_millis};
use crate::repositories::ReadingRepository;
use crate::services::{DeviceMonitor, ServiceEvent};

pub struct IngestOutcome {
    pub readings: Vec<Reading>,
    pub timestamp: OffsetDateTime,
}

/// Single write path for device, manual and simulated readings.
pub struct IngestService {
    reading_repository: Arc<ReadingRepository>,
    monitor: Arc<DeviceMonitor>,
    sender: Sender<ServiceEvent>,
    settings: Ingest,
}

impl IngestService {
    pub fn new(
        reading_repository: Arc<ReadingRepository>,
        monitor: Arc<DeviceMonitor>,
        sender: Sender<ServiceEvent>,
        settings: Ingest,
    ) -> Self {
        Self {
            reading_repository,
            monitor,
            sender,
            settings,
        }
    }

    pub async fn ingest(
        &self,
        values: &SensorValues,
        device_id: Option<&str>,
        client_timestamp: Option<&str>,
    ) -> Result<IngestOutcome, ApiError> {
        let valid = values.valid_readings();
        if valid.is_empty() {
            return Err(ReadingError::NoValidReadings.into());
        }

        let device_id = device_id.unwrap_or(&self.settings.default_device_id);
        let received_at = OffsetDateTime::now_utc();
        let timestamp = truncate_to_millis(self.resolve_timestamp(device_id, client_timestamp, received_at));

        let mut tx = self.reading_repository.get_pool().begin().await?;
        let mut readings = Vec::with_capacity(valid.len());

        for (sensor_type, value) in valid {
            let record = ReadingRecord {
                id: 0,
                sensor_type,
                value,
                unit: sensor_type.unit().to_string(),
                timestamp_ms: to_millis(timestamp),
                device_id: device_id.to_string(),
            };

            let id = self.reading_repository.create(&record, &mut tx).await?;
            readings.push(Reading::from(ReadingRecord { id, ..record }));
        }

        tx.commit().await?;

        self.monitor.record(device_id, received_at).await;

        tracing::debug!(device_id, count = readings.len(), "readings stored");

        // No subscribers is not an error
        let _ = self.sender.send(ServiceEvent::ReadingsCreated(readings.clone()));

        Ok(IngestOutcome { readings, timestamp })
    }

    pub async fn ingest_one(
        &self,
        sensor_type: SensorType,
        value: f64,
        device_id: Option<&str>,
        client_timestamp: Option<&str>,
    ) -> Result<IngestOutcome, ApiError> {
        if !SensorValues::is_valid(sensor_type, value) {
            return Err(ReadingError::InvalidValue(sensor_type.as_str()).into());
        }

        let mut values = SensorValues::default();
        values.set(sensor_type, value);

        self.ingest(&values, device_id, client_timestamp).await
    }

    fn resolve_timestamp(
        &self,
        device_id: &str,
        client_timestamp: Option<&str>,
        received_at: OffsetDateTime,
    ) -> OffsetDateTime {
        if !self.settings.is_trusted(device_id) {
            return received_at;
        }

        match client_timestamp {
            Some(value) => parse_client_timestamp(value).unwrap_or_else(|| {
                tracing::warn!(device_id, value, "unparsable client timestamp, using receipt time");
                received_at
            }),
            None => received_at,
        }
    }
}

/// Accepts RFC 3339, or ISO 8601 without an offset which is read as UTC.
pub fn parse_client_timestamp(value: &str) -> Option<OffsetDateTime> {
    if let Ok(timestamp) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(timestamp.to_offset(UtcOffset::UTC));
    }

    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );

    PrimitiveDateTime::parse(value, format)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}
