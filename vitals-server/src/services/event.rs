use serde::{Deserialize, Serialize};
use vitals_api::{Alert, Reading};

/// Broadcast to server-sent event subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ServiceEvent {
    ReadingsCreated(Vec<Reading>),
    AlertCreated(Alert),
}

impl ServiceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceEvent::ReadingsCreated(_) => "readings",
            ServiceEvent::AlertCreated(_) => "alert",
        }
    }
}
