pub mod broker;
mod device_orchestrator;
pub mod domain;

pub use device_orchestrator::*;
