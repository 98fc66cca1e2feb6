use serde::{Deserialize, Serialize};
use vitals_api::{Reading, SensorType};

use super::{Table, from_millis};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReadingRecord {
    pub id: i32,
    #[sqlx(try_from = "String")]
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: String,
    pub timestamp_ms: i64,
    pub device_id: String,
}

impl From<ReadingRecord> for Reading {
    fn from(record: ReadingRecord) -> Self {
        Reading {
            id: record.id,
            sensor_type: record.sensor_type,
            value: record.value,
            unit: record.unit,
            timestamp: from_millis(record.timestamp_ms),
            device_id: record.device_id,
        }
    }
}

#[derive(Clone)]
pub struct ReadingTable;

impl Table for ReadingTable {
    fn name(&self) -> &'static str {
        "readings"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sensor_type TEXT NOT NULL,
                value REAL NOT NULL,
                unit TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                device_id TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_readings_sensor_time ON readings (sensor_type, timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_readings_device_time ON readings (device_id, timestamp_ms);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS readings;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
