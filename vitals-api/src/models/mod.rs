mod alert;
mod analysis;
mod device;
mod reading;
mod system;

pub use alert::*;
pub use analysis::*;
pub use device::*;
pub use reading::*;
pub use system::*;

pub type Id = i32;
