//! # Herald
//!
//! A typed command dispatch framework for chat bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌─────────┐   ┌────────┐   ┌─────────┐   ┌─────────┐
//! │ Platform │──▶│   Parser    │──▶│ Filters │──▶│ Router │──▶│ Binder  │──▶│ Handler │
//! │  events  │   │ (text/slash)│   │         │   │        │   │(adapt + │   │ (tower  │
//! └──────────┘   └─────────────┘   └─────────┘   └────────┘   │validate)│   │ service)│
//!                                                             └─────────┘   └─────────┘
//! ```
//!
//! - **Core**: platform entities, inbound events and reply callbacks
//! - **Framework**: the command catalog and the dispatch pipeline
//! - **Runtime**: configuration, logging and bounded event intake
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! async fn ping(_event: CommandEvent) -> &'static str {
//!     "pong"
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let lifecycle = DispatcherLifecycle::new();
//!     let runtime = HeraldRuntime::builder()
//!         .command(CommandDefinition::builder("ping").handler(ping))
//!         .build(&lifecycle)?;
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `herald.toml` (default)
//! - `yaml-config`: read `herald.yaml`
//! - `json-log`: JSON log output

pub use herald_core as core;
pub use herald_framework as framework;
pub use herald_runtime as runtime;

/// Commonly used types for building a bot.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use herald_runtime::{HeraldConfig, HeraldRuntime, RuntimeBuilder, RuntimeError};

    // Declaring commands
    pub use herald_framework::{
        CatalogBuilder, CommandDefinition, ParameterDefinition, ParameterType,
        TypeAdapterRegistry, ValidatorRegistry,
    };

    // Writing handlers
    pub use herald_framework::{Arg, BoxError, CommandEvent, HandlerResponse};

    // Dispatch
    pub use herald_framework::{
        DispatchOutcome, Dispatcher, DispatcherLifecycle, Filter, FilterPosition,
        InvocationContext, RoutingPolicy,
    };

    // Platform model
    pub use herald_core::{
        Channel, ChannelType, EventSource, Guild, InboundEvent, InteractionEvent, Member,
        MemoryGuild, MessageEvent, OptionData, ReplyCallback, ReplyPayload, Role, User,
    };
}
