mod alert_service;
mod analysis_service;
mod device_monitor;
mod event;
mod ingest_service;
mod query_service;
mod simulator_service;

pub use alert_service::*;
pub use analysis_service::*;
pub use device_monitor::*;
pub use event::*;
pub use ingest_service::*;
pub use query_service::*;
pub use simulator_service::*;
