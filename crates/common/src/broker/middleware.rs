mod consume_logging;
mod consume_tracing;
mod consume_types;

pub use consume_logging::*;
pub use consume_tracing::*;
pub use consume_types::*;
