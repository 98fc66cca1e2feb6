use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::AlertRecord;

#[derive(Clone)]
pub struct AlertRepository {
    storage: Arc<Storage>,
}

impl AlertRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl AlertRepository {
    pub async fn create(
        &self,
        item: &AlertRecord,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO alerts (level, title, message, timestamp_ms, sensor_type, trigger_value, normal_range)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&item.level)
        .bind(&item.title)
        .bind(&item.message)
        .bind(item.timestamp_ms)
        .bind(&item.sensor_type)
        .bind(item.trigger_value)
        .bind(&item.normal_range)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_latest(&self, limit: i64) -> Result<Vec<AlertRecord>, Error> {
        let alerts: Vec<AlertRecord> = sqlx::query_as(
            r#"
            SELECT * FROM alerts
            ORDER BY timestamp_ms DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(alerts)
    }

    pub async fn delete_all(&self, transaction: &mut Transaction<'_, Sqlite>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM alerts")
            .execute(&mut **transaction)
            .await?;

        Ok(result.rows_affected())
    }
}
