mod client;
mod config;
mod device_repository;
mod migrations;
mod telemetry_repository;

pub use client::*;
pub use config::*;
pub use device_repository::*;
pub use migrations::*;
pub use telemetry_repository::*;
