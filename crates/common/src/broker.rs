mod channel_consumer;
mod device_event_producer;
mod error;
mod in_memory_broker;
mod message;
mod middleware;
mod nats_broker;
mod trace_context;
mod traits;

pub use channel_consumer::*;
pub use device_event_producer::*;
pub use error::*;
pub use in_memory_broker::*;
pub use message::*;
pub use middleware::*;
pub use nats_broker::*;
pub use trace_context::*;
pub use traits::*;
