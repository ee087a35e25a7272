//! Logging abstraction used by the tile cache and dispatch layer.
//!
//! Components take an `Arc<dyn Logger>` and log through the `log_*!`
//! macros. Production wires in [`TracingLogger`]; tests use [`NoOpLogger`]
//! to stay quiet or [`MemoryLogger`] to assert on what was logged.
//!
//! ```
//! use ortholayer::log::{Logger, NoOpLogger};
//! use ortholayer::log_info;
//! use std::sync::Arc;
//!
//! let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
//! log_info!(logger, "mounted {} tiles", 0);
//! ```

mod memory;
mod noop;
mod tracing_adapter;
mod r#trait;

pub use memory::MemoryLogger;
pub use noop::NoOpLogger;
pub use r#trait::{LogLevel, Logger};
pub use tracing_adapter::TracingLogger;
