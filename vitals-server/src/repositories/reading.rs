use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite, Transaction};
use vitals_api::SensorType;

use crate::configs::Storage;
use crate::models::ReadingRecord;

#[derive(Clone)]
pub struct ReadingRepository {
    storage: Arc<Storage>,
}

impl ReadingRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl ReadingRepository {
    pub async fn create(
        &self,
        item: &ReadingRecord,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO readings (sensor_type, value, unit, timestamp_ms, device_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.sensor_type.as_str())
        .bind(item.value)
        .bind(&item.unit)
        .bind(item.timestamp_ms)
        .bind(&item.device_id)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    // Newest reading of one sensor type, later insert wins a timestamp tie
    pub async fn find_latest_by_sensor(
        &self,
        sensor_type: SensorType,
    ) -> Result<Option<ReadingRecord>, Error> {
        let reading: Option<ReadingRecord> = sqlx::query_as(
            r#"
            SELECT * FROM readings
            WHERE sensor_type = $1
            ORDER BY timestamp_ms DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(sensor_type.as_str())
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(reading)
    }

    // Newest first page of one sensor type inside [from, to]
    pub async fn find_by_sensor_in_range(
        &self,
        sensor_type: SensorType,
        from_ms: i64,
        to_ms: i64,
        limit: i64,
    ) -> Result<Vec<ReadingRecord>, Error> {
        let readings: Vec<ReadingRecord> = sqlx::query_as(
            r#"
            SELECT * FROM readings
            WHERE sensor_type = $1 AND timestamp_ms >= $2 AND timestamp_ms <= $3
            ORDER BY timestamp_ms DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(sensor_type.as_str())
        .bind(from_ms)
        .bind(to_ms)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(readings)
    }

    // Newest reading not produced by the given device
    pub async fn find_latest_excluding_device(
        &self,
        device_id: &str,
    ) -> Result<Option<ReadingRecord>, Error> {
        let reading: Option<ReadingRecord> = sqlx::query_as(
            r#"
            SELECT * FROM readings
            WHERE device_id != $1
            ORDER BY timestamp_ms DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(reading)
    }

    pub async fn count(&self) -> Result<i64, Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM readings")
            .fetch_one(self.storage.get_pool())
            .await?;

        Ok(count)
    }

    pub async fn delete_all(&self, transaction: &mut Transaction<'_, Sqlite>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM readings")
            .execute(&mut **transaction)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use crate::models::to_millis;
    use crate::tests::*;

    use super::*;

    #[tokio::test]
    async fn test_create_and_find_reading() {
        let storage = setup_test_db().await;
        let repo = ReadingRepository::new(storage.clone());

        let now = OffsetDateTime::now_utc();
        let id = create_test_reading(storage.clone(), SensorType::Temperature, 36.8, "esp32_real", now).await;

        let found = repo.find_latest_by_sensor(SensorType::Temperature).await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.sensor_type, SensorType::Temperature);
        assert_eq!(found.value, 36.8);
        assert_eq!(found.unit, "°C");
        assert_eq!(found.timestamp_ms, to_millis(now));
        assert_eq!(found.device_id, "esp32_real");
    }

    #[tokio::test]
    async fn test_latest_by_sensor_uses_timestamp_not_insert_order() {
        let storage = setup_test_db().await;
        let repo = ReadingRepository::new(storage.clone());

        let now = OffsetDateTime::now_utc();
        create_test_reading(storage.clone(), SensorType::HeartRate, 80.0, "esp32_real", now).await;
        create_test_reading(storage.clone(), SensorType::HeartRate, 70.0, "esp32_real", now - Duration::minutes(5)).await;
        create_test_reading(storage.clone(), SensorType::Gsr, 400.0, "esp32_real", now + Duration::minutes(1)).await;

        let latest = repo.find_latest_by_sensor(SensorType::HeartRate).await.unwrap().unwrap();
        assert_eq!(latest.value, 80.0);

        assert!(repo.find_latest_by_sensor(SensorType::BloodPressure).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_by_sensor_breaks_ties_by_insert_order() {
        let storage = setup_test_db().await;
        let repo = ReadingRepository::new(storage.clone());

        let now = OffsetDateTime::now_utc();
        create_test_reading(storage.clone(), SensorType::HeartRate, 71.0, "esp32_real", now).await;
        create_test_reading(storage.clone(), SensorType::HeartRate, 72.0, "esp32_real", now).await;

        let latest = repo.find_latest_by_sensor(SensorType::HeartRate).await.unwrap().unwrap();
        assert_eq!(latest.value, 72.0);
    }

    #[tokio::test]
    async fn test_find_by_sensor_in_range() {
        let storage = setup_test_db().await;
        let repo = ReadingRepository::new(storage.clone());

        let now = OffsetDateTime::now_utc();
        for minutes in [1, 10, 30, 90] {
            create_test_reading(
                storage.clone(),
                SensorType::OxygenSaturation,
                90.0 + minutes as f64 / 10.0,
                "esp32_real",
                now - Duration::minutes(minutes),
            )
            .await;
        }

        let readings = repo
            .find_by_sensor_in_range(
                SensorType::OxygenSaturation,
                to_millis(now - Duration::hours(1)),
                to_millis(now),
                2,
            )
            .await
            .unwrap();

        assert_eq!(readings.len(), 2);
        assert!(readings[0].timestamp_ms > readings[1].timestamp_ms);
        assert_eq!(readings[0].value, 90.1);
    }

    #[tokio::test]
    async fn test_find_latest_excluding_device() {
        let storage = setup_test_db().await;
        let repo = ReadingRepository::new(storage.clone());

        let now = OffsetDateTime::now_utc();
        create_test_reading(storage.clone(), SensorType::HeartRate, 75.0, "esp32_real", now - Duration::minutes(2)).await;
        create_test_reading(storage.clone(), SensorType::HeartRate, 76.0, "esp32_demo", now).await;

        let latest = repo.find_latest_excluding_device("esp32_demo").await.unwrap().unwrap();
        assert_eq!(latest.device_id, "esp32_real");
        assert_eq!(latest.value, 75.0);
    }

    #[tokio::test]
    async fn test_delete_all_readings() {
        let storage = setup_test_db().await;
        let repo = ReadingRepository::new(storage.clone());

        let now = OffsetDateTime::now_utc();
        create_test_reading(storage.clone(), SensorType::HeartRate, 75.0, "esp32_real", now).await;
        create_test_reading(storage.clone(), SensorType::Gsr, 410.0, "esp32_real", now).await;

        let mut tx = storage.get_pool().begin().await.unwrap();
        let deleted = repo.delete_all(&mut tx).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
