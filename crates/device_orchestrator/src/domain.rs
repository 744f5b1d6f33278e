mod device_lifecycle_service;
mod device_orchestrator_config;
mod device_starter;
mod event_router;
mod gates_service;
mod gates_status_check;
mod health_check;
mod reschedule_plan;
mod temperature_check;
mod warming_service;

pub use device_lifecycle_service::*;
pub use device_orchestrator_config::*;
pub use device_starter::*;
pub use event_router::*;
pub use gates_service::*;
pub use gates_status_check::*;
pub use health_check::*;
pub use reschedule_plan::*;
pub use temperature_check::*;
pub use warming_service::*;
