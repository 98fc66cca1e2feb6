use serde::{Deserialize, Serialize};
use vitals_api::{Analysis, HealthStatus};

use super::{Table, from_millis};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AnalysisRecord {
    pub id: i32,
    pub health_status: String,
    pub summary: String,
    pub source: String,
    pub alerts_generated: i64,
    pub timestamp_ms: i64,
}

impl From<AnalysisRecord> for Analysis {
    fn from(record: AnalysisRecord) -> Self {
        Analysis {
            id: record.id,
            health_status: record.health_status.parse().unwrap_or(HealthStatus::NoData),
            summary: record.summary,
            source: record.source.into(),
            alerts_generated: record.alerts_generated,
            timestamp: from_millis(record.timestamp_ms),
        }
    }
}

#[derive(Clone)]
pub struct AnalysisTable;

impl Table for AnalysisTable {
    fn name(&self) -> &'static str {
        "analyses"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                health_status TEXT NOT NULL,
                summary TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT 'rules',
                alerts_generated INTEGER NOT NULL DEFAULT 0,
                timestamp_ms INTEGER NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS analyses;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
