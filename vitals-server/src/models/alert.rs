use serde::{Deserialize, Serialize};
use vitals_api::{Alert, AlertLevel};

use super::{Table, from_millis};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertRecord {
    pub id: i32,
    pub level: String,
    pub title: String,
    pub message: String,
    pub timestamp_ms: i64,
    pub sensor_type: Option<String>,
    pub trigger_value: Option<f64>,
    pub normal_range: Option<String>,
}

impl From<AlertRecord> for Alert {
    fn from(record: AlertRecord) -> Self {
        Alert {
            id: record.id,
            level: record.level.parse().unwrap_or(AlertLevel::Info),
            title: record.title,
            message: record.message,
            timestamp: from_millis(record.timestamp_ms),
            sensor_type: record.sensor_type.and_then(|value| value.parse().ok()),
            trigger_value: record.trigger_value,
            normal_range: record.normal_range,
        }
    }
}

#[derive(Clone)]
pub struct AlertTable;

impl Table for AlertTable {
    fn name(&self) -> &'static str {
        "alerts"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                level TEXT NOT NULL CHECK (level IN ('info', 'warning', 'critical')),
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                sensor_type TEXT,
                trigger_value REAL,
                normal_range TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_alerts_time ON alerts (timestamp_ms);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS alerts;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
