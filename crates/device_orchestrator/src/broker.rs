mod device_event_consumer;
mod device_event_service;

pub use device_event_consumer::*;
pub use device_event_service::*;
