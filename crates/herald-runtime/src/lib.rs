//! Herald Runtime - configuration, logging and event intake.
//!
//! This crate provides:
//! - Layered configuration (`herald.toml`, profiles, `HERALD_*` environment)
//! - Logging setup on `tracing-subscriber`
//! - [`HeraldRuntime`], which parses inbound events, dispatches them on
//!   bounded concurrent tasks and shuts down gracefully
//!
//! ```rust,ignore
//! use herald_runtime::{DispatcherLifecycle, HeraldRuntime};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let lifecycle = DispatcherLifecycle::new();
//!     let runtime = HeraldRuntime::builder()
//!         .command(CommandDefinition::builder("ping").handler(ping))
//!         .build(&lifecycle)?;
//!
//!     // Feed runtime.handle_event(..) from the platform connection.
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, HeraldConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use herald_framework::DispatcherLifecycle;
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{HeraldRuntime, RuntimeBuilder, RuntimeStats};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and span helpers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
