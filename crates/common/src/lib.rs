pub mod adapters;
pub mod broker;
pub mod domain;
pub mod memory;
pub mod postgres;
pub mod scheduler;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeviceRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockGatesClient;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockTelemetryRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockTemperatureClient;
