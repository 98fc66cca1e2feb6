use std::sync::Arc;

use futures::future::try_join_all;
use time::OffsetDateTime;
use vitals_api::{LatestReadings, Reading, SensorType};

use crate::errors::{ApiError, ReadingError};
use crate::models::to_millis;
use crate::repositories::ReadingRepository;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 1000;
pub const DEFAULT_HISTORY_HOURS: i64 = 24;

const MILLIS_PER_HOUR: i64 = 3_600_000;

pub struct History {
    pub readings: Vec<Reading>,
    pub hours: i64,
}

pub struct QueryService {
    reading_repository: Arc<ReadingRepository>,
}

impl QueryService {
    pub fn new(reading_repository: Arc<ReadingRepository>) -> Self {
        Self { reading_repository }
    }

    /// Newest reading per sensor type. Types without data are left out.
    pub async fn latest(&self) -> Result<LatestReadings, ApiError> {
        let latest = try_join_all(
            SensorType::ALL
                .into_iter()
                .map(|sensor_type| self.reading_repository.find_latest_by_sensor(sensor_type)),
        )
        .await?;

        Ok(latest
            .into_iter()
            .flatten()
            .map(|record| (record.sensor_type, Reading::from(record)))
            .collect())
    }

    /// Up to `limit` readings of the last `hours`, newest first.
    pub async fn history(
        &self,
        limit: Option<i64>,
        hours: Option<i64>,
        now: OffsetDateTime,
    ) -> Result<History, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if limit < 1 {
            return Err(ReadingError::InvalidLimit.into());
        }
        let limit = limit.min(MAX_HISTORY_LIMIT);

        let hours = hours.unwrap_or(DEFAULT_HISTORY_HOURS);
        if hours < 1 {
            return Err(ReadingError::InvalidWindow.into());
        }

        // Saturates for huge windows, which then cover everything stored
        let to_ms = to_millis(now);
        let from_ms = to_ms.saturating_sub(hours.saturating_mul(MILLIS_PER_HOUR));

        // A page per type is enough: the merged top `limit` can't need more from any one type
        let pages = try_join_all(SensorType::ALL.into_iter().map(|sensor_type| {
            self.reading_repository
                .find_by_sensor_in_range(sensor_type, from_ms, to_ms, limit)
        }))
        .await?;

        let mut records: Vec<_> = pages.into_iter().flatten().collect();
        records.sort_by(|a, b| {
            b.timestamp_ms
                .cmp(&a.timestamp_ms)
                .then_with(|| b.id.cmp(&a.id))
        });
        records.truncate(limit as usize);

        Ok(History {
            readings: records.into_iter().map(Reading::from).collect(),
            hours,
        })
    }
}
