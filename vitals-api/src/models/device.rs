use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Reading;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// A real device reported within the recency window
    pub connected: bool,
    /// Last time a real device reported
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_reading_timestamp: Option<OffsetDateTime>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Esp32StatusResponse {
    pub connected: bool,
    /// Most recent reading from a real device
    pub last_reading: Option<Reading>,
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
}
