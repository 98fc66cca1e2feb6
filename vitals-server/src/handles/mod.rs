mod alert_handle;
mod analysis_handle;
mod esp32_handle;
mod openapi;
mod sse_handle;
mod system_handle;
mod vital_sign_handle;

pub use alert_handle::*;
pub use analysis_handle::*;
pub use esp32_handle::*;
pub use openapi::*;
pub use sse_handle::*;
pub use system_handle::*;
pub use vital_sign_handle::*;
