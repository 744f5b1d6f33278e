mod adapter;
mod device;
mod device_event;
mod device_telemetry;
mod result;

pub use adapter::*;
pub use device::*;
pub use device_event::*;
pub use device_telemetry::*;
pub use result::*;
