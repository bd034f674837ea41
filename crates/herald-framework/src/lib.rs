//! # Herald Framework
//!
//! The command dispatch pipeline.
//!
//! This layer provides:
//! - A validated command catalog with parameters, constraints and sub-commands
//! - Parsers that turn free-text messages and structured interactions into
//!   invocation contexts
//! - Routing with alias, case and ambiguity handling
//! - A three-phase filter chain (mutes, permissions, cooldowns, channel checks)
//! - Type adapters and validators that bind raw tokens to typed arguments
//! - Axum-style async handlers, stored as tower services
//! - The [`Dispatcher`] that runs all of the above and reports failures
//!
//! ```rust,ignore
//! use herald_framework::*;
//!
//! async fn add(_event: CommandEvent, a: i64, b: i64) -> String {
//!     (a + b).to_string()
//! }
//!
//! let adapters = TypeAdapterRegistry::new();
//! let catalog = CatalogBuilder::new()
//!     .command(
//!         CommandDefinition::builder("add")
//!             .param(ParameterDefinition::of::<i64>("a"))
//!             .param(ParameterDefinition::of::<i64>("b"))
//!             .handler(add),
//!     )
//!     .build(&adapters, &ValidatorRegistry::new())?;
//!
//! let lifecycle = DispatcherLifecycle::new();
//! let dispatcher = Dispatcher::builder(catalog).adapters(adapters).start(&lifecycle)?;
//! ```

pub mod adapter;
pub mod binder;
pub mod catalog;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod handler;
pub mod lifecycle;
pub mod messages;
pub mod parser;
pub mod router;
pub mod sender;
pub mod settings;
pub mod validation;

#[cfg(test)]
mod testing;

pub use adapter::{TypeAdapter, TypeAdapterRegistry};
pub use binder::ArgumentBinder;
pub use catalog::{
    CatalogBuilder, Choice, CommandBuilder, CommandCatalog, CommandDefinition,
    ConstraintDefinition, ParameterBuilder, ParameterDefinition, ParameterType,
};
pub use context::{InputKind, InvocationContext};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use error::{
    ArgumentError, CatalogError, CatalogResult, DispatchError, DispatchResult, HandlerPanic,
};
pub use filter::{
    DefaultPermissionsProvider, Filter, FilterPosition, FilterRegistry, PermissionsProvider,
};
pub use handler::{
    Arg, Argument, BoxedHandlerService, CommandEvent, FromArgument, Handler, HandlerResponse,
    HandlerService, Invocation, into_service,
};
pub use lifecycle::DispatcherLifecycle;
pub use messages::{
    DefaultErrorMessageFactory, DefaultHelpMessageFactory, ErrorMessageFactory,
    HelpMessageFactory,
};
pub use parser::{
    InteractionParser, MessageParser, MigratingMessageParser, Parser, ParserSupervisor,
    RoutingPolicy,
};
pub use router::{CommandRouter, Route, Router};
pub use sender::{DefaultReplySink, ReplySink};
pub use settings::{BoxedSettingsProvider, GuildSettings, SettingsProvider, StaticSettingsProvider};
pub use validation::{Validator, ValidatorRegistry};

/// Re-exported so handlers can name the error type without depending on tower.
pub use tower::BoxError;
