use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::AnalysisRecord;

#[derive(Clone)]
pub struct AnalysisRepository {
    storage: Arc<Storage>,
}

impl AnalysisRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl AnalysisRepository {
    pub async fn create(
        &self,
        item: &AnalysisRecord,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO analyses (health_status, summary, source, alerts_generated, timestamp_ms)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&item.health_status)
        .bind(&item.summary)
        .bind(&item.source)
        .bind(item.alerts_generated)
        .bind(item.timestamp_ms)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_latest(&self) -> Result<Option<AnalysisRecord>, Error> {
        let analysis: Option<AnalysisRecord> = sqlx::query_as(
            "SELECT * FROM analyses ORDER BY timestamp_ms DESC, id DESC LIMIT 1",
        )
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(analysis)
    }

    pub async fn delete_all(&self, transaction: &mut Transaction<'_, Sqlite>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM analyses")
            .execute(&mut **transaction)
            .await?;

        Ok(result.rows_affected())
    }
}
