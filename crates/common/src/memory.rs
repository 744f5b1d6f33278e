mod device_store;

pub use device_store::*;
