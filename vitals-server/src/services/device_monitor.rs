use std::collections::HashMap;

use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use vitals_api::DeviceStatus;

/// Tracks when each physical device last delivered readings.
pub struct DeviceMonitor {
    last_seen: RwLock<HashMap<String, OffsetDateTime>>,
    simulated_device: String,
    recency_window: Duration,
}

impl DeviceMonitor {
    pub fn new(simulated_device: impl Into<String>, recency_window: std::time::Duration) -> Self {
        Self {
            last_seen: RwLock::new(HashMap::new()),
            simulated_device: simulated_device.into(),
            recency_window: Duration::seconds(recency_window.as_secs() as i64),
        }
    }

    pub fn simulated_device(&self) -> &str {
        &self.simulated_device
    }

    pub fn is_simulated(&self, device_id: &str) -> bool {
        device_id == self.simulated_device
    }

    /// Marks a device as heard from. Simulated readings never count.
    pub async fn record(&self, device_id: &str, received_at: OffsetDateTime) {
        if self.is_simulated(device_id) {
            return;
        }

        let mut last_seen = self.last_seen.write().await;
        last_seen.insert(device_id.to_string(), received_at);
    }

    pub async fn status(&self, now: OffsetDateTime) -> DeviceStatus {
        let last_seen = self.last_seen.read().await;
        let last_reading_timestamp = last_seen.values().max().copied();

        DeviceStatus {
            connected: last_reading_timestamp
                .is_some_and(|last| now - last <= self.recency_window),
            last_reading_timestamp,
        }
    }

    pub async fn is_connected(&self, now: OffsetDateTime) -> bool {
        self.status(now).await.connected
    }

    pub async fn reset(&self) {
        self.last_seen.write().await.clear();
    }
}
