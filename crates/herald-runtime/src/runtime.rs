//! Event intake and orchestration.
//!
//! The [`HeraldRuntime`] owns the configuration, the parser supervisor and
//! the dispatcher. Platform glue hands it inbound events; each accepted
//! event is dispatched on its own task, bounded by
//! `runtime.max_in_flight`.
//!
//! ```rust,ignore
//! use herald_runtime::{HeraldRuntime, DispatcherLifecycle};
//!
//! let lifecycle = DispatcherLifecycle::new();
//! let runtime = HeraldRuntime::builder()
//!     .config_file("config/herald.toml")
//!     .command(CommandDefinition::builder("ping").handler(ping))
//!     .build(&lifecycle)?;
//!
//! // From the platform's event loop:
//! runtime.handle_message(MessageEvent::new(content, source));
//!
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use herald_core::{InboundEvent, InteractionEvent, MessageEvent};
use herald_framework::{
    CatalogBuilder, CommandBuilder, DispatchOutcome, Dispatcher, DispatcherBuilder,
    DispatcherLifecycle, ParserSupervisor, SettingsProvider, StaticSettingsProvider,
    TypeAdapterRegistry, ValidatorRegistry,
};
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ConfigLoader, HeraldConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// Counters of what happened to inbound events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Events handed to the runtime.
    pub received: u64,
    /// Events no parser accepted.
    pub ignored: u64,
    /// Events refused because the runtime was shutting down.
    pub rejected: u64,
    pub executed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub help: u64,
}

impl std::fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "received: {}, ignored: {}, rejected: {}, executed: {}, failed: {}, cancelled: {}, help: {}",
            self.received,
            self.ignored,
            self.rejected,
            self.executed,
            self.failed,
            self.cancelled,
            self.help
        )
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    received: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    help: AtomicU64,
}

impl StatsCounters {
    fn record(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Executed => &self.executed,
            DispatchOutcome::Failed => &self.failed,
            DispatchOutcome::Cancelled => &self.cancelled,
            DispatchOutcome::Help => &self.help,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            received: self.received.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            help: self.help.load(Ordering::Relaxed),
        }
    }
}

/// The Herald runtime.
///
/// Cheap to clone; clones share the dispatcher, the in-flight bound and
/// the shutdown state.
#[derive(Clone)]
pub struct HeraldRuntime {
    config: Arc<HeraldConfig>,
    dispatcher: Arc<Dispatcher>,
    parsers: Arc<ParserSupervisor>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    stats: Arc<StatsCounters>,
}

impl HeraldRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn parsers(&self) -> &ParserSupervisor {
        &self.parsers
    }

    pub fn stats(&self) -> RuntimeStats {
        self.stats.snapshot()
    }

    /// `false` once shutdown has begun.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Hands an event to the runtime.
    ///
    /// Returns `None` if no parser accepted the event or the runtime is
    /// shutting down. Otherwise the event is dispatched on a new task; the
    /// handle resolves to the outcome, or `None` if shutdown began while
    /// the task was waiting for a slot.
    pub fn handle_event(
        &self,
        event: impl Into<InboundEvent>,
    ) -> Option<JoinHandle<Option<DispatchOutcome>>> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        if self.shutdown.is_cancelled() {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            debug!("Runtime is shutting down, event rejected");
            return None;
        }

        let Some(mut ctx) = self.parsers.parse(event.into()) else {
            self.stats.ignored.fetch_add(1, Ordering::Relaxed);
            trace!("Event is not a command invocation");
            return None;
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let permits = Arc::clone(&self.permits);
        let shutdown = self.shutdown.clone();
        let stats = Arc::clone(&self.stats);

        Some(self.tracker.spawn(async move {
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => permit.ok()?,
                _ = shutdown.cancelled() => {
                    stats.rejected.fetch_add(1, Ordering::Relaxed);
                    debug!("Shutdown began before the event was dispatched");
                    return None;
                }
            };

            match dispatcher.on_event(&mut ctx).await {
                Ok(outcome) => {
                    stats.record(outcome);
                    Some(outcome)
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(error = %e, "Dispatch failed");
                    Some(DispatchOutcome::Failed)
                }
            }
        }))
    }

    pub fn handle_message(
        &self,
        event: MessageEvent,
    ) -> Option<JoinHandle<Option<DispatchOutcome>>> {
        self.handle_event(event)
    }

    pub fn handle_interaction(
        &self,
        event: InteractionEvent,
    ) -> Option<JoinHandle<Option<DispatchOutcome>>> {
        self.handle_event(event)
    }

    /// Runs until Ctrl+C (or SIGTERM on unix), then shuts down.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!(
            commands = self.dispatcher.catalog().len(),
            policy = ?self.parsers.policy(),
            "Herald runtime is now running. Press Ctrl+C to stop."
        );
        let result = wait_for_signal().await;
        self.shutdown().await;
        result
    }

    /// Runs until `shutdown` completes, then shuts down.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            commands = self.dispatcher.catalog().len(),
            "Herald runtime is now running"
        );
        shutdown.await;
        self.shutdown().await;
        Ok(())
    }

    /// Stops accepting events and waits, up to
    /// `runtime.shutdown_timeout_secs`, for in-flight dispatches.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        info!(in_flight = self.tracker.len(), "Stopping Herald runtime");

        self.shutdown.cancel();
        self.tracker.close();

        let timeout = self.config.runtime.shutdown_timeout();
        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.tracker.len(),
                timeout_secs = timeout.as_secs(),
                "Timed out waiting for in-flight commands"
            );
        }

        info!(stats = %self.stats(), "Runtime stopped");
    }
}

async fn wait_for_signal() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

type DispatcherSetup = Box<dyn FnOnce(DispatcherBuilder) -> DispatcherBuilder + Send>;
type ParserSetup = Box<dyn FnOnce(&mut ParserSupervisor) + Send>;

/// Builder for a [`HeraldRuntime`].
///
/// ```rust,ignore
/// let runtime = HeraldRuntime::builder()
///     .profile("production")
///     .command(CommandDefinition::builder("ping").handler(ping))
///     .dispatcher(|d| d.reply_sink(MyReplySink))
///     .build(&lifecycle)?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<HeraldConfig>,
    catalog: CatalogBuilder,
    adapters: TypeAdapterRegistry,
    validators: ValidatorRegistry,
    settings: Option<Arc<dyn SettingsProvider>>,
    dispatcher_setup: Vec<DispatcherSetup>,
    parser_setup: Vec<ParserSetup>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Searches the current directory for configuration files.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            catalog: CatalogBuilder::new(),
            adapters: TypeAdapterRegistry::new(),
            validators: ValidatorRegistry::new(),
            settings: None,
            dispatcher_setup: Vec::new(),
            parser_setup: Vec::new(),
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration below files and the environment.
    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, skipping file and environment loading.
    pub fn config(mut self, config: HeraldConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.catalog = self.catalog.command(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = CommandBuilder>) -> Self {
        self.catalog = self.catalog.commands(commands);
        self
    }

    /// Replaces the type adapters (the built-in set by default).
    pub fn adapters(mut self, adapters: TypeAdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Replaces the validators (the built-in set by default).
    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    /// Replaces the settings provider built from `[dispatch]`.
    pub fn settings(mut self, provider: impl SettingsProvider + 'static) -> Self {
        self.settings = Some(Arc::new(provider));
        self
    }

    /// Customises the dispatcher (reply sink, messages, filters, ...).
    pub fn dispatcher<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(DispatcherBuilder) -> DispatcherBuilder + Send + 'static,
    {
        self.dispatcher_setup.push(Box::new(setup));
        self
    }

    /// Replaces or removes the parsers chosen by the routing policy.
    pub fn parsers<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut ParserSupervisor) + Send + 'static,
    {
        self.parser_setup.push(Box::new(setup));
        self
    }

    /// Whether `build` installs the global subscriber (default `true`).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Loads configuration, validates the catalog and starts the
    /// dispatcher against `lifecycle`.
    pub fn build(self, lifecycle: &DispatcherLifecycle) -> RuntimeResult<HeraldRuntime> {
        let config = match self.config {
            Some(config) => {
                crate::config::validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let catalog = self.catalog.build(&self.adapters, &self.validators)?;

        let settings = self.settings.unwrap_or_else(|| {
            Arc::new(StaticSettingsProvider::new(config.dispatch.guild_settings()))
        });
        let mut parsers =
            ParserSupervisor::new(config.dispatch.policy, settings, config.dispatch.self_id);
        for setup in self.parser_setup {
            setup(&mut parsers);
        }

        let mut dispatcher = Dispatcher::builder(catalog).adapters(self.adapters);
        for setup in self.dispatcher_setup {
            dispatcher = setup(dispatcher);
        }
        let dispatcher = dispatcher.start(lifecycle)?;

        info!(
            commands = dispatcher.catalog().len(),
            policy = ?config.dispatch.policy,
            max_in_flight = config.runtime.max_in_flight,
            "Runtime initialized from configuration"
        );

        Ok(HeraldRuntime {
            permits: Arc::new(Semaphore::new(config.runtime.max_in_flight)),
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            parsers: Arc::new(parsers),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            stats: Arc::new(StatsCounters::default()),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use herald_core::{
        BufferedReply, Channel, ChannelType, EventSource, Member, MemoryGuild, OptionData,
        ReplyPayload, User,
    };
    use herald_framework::{CommandDefinition, CommandEvent, DispatchError, ParameterDefinition};

    use super::*;
    use crate::config::RuntimeConfig;
    use crate::error::RuntimeError;

    async fn add(_event: CommandEvent, a: i64, b: i64) -> String {
        (a + b).to_string()
    }

    fn source(reply: Arc<BufferedReply>) -> EventSource {
        let author = User::new(7, "alice");
        let channel = Channel::new(20, "general", ChannelType::Text);
        let guild = MemoryGuild::new(1, "Test")
            .with_member(Member::new(author.clone()))
            .with_channel(channel.clone());
        EventSource::new(author.clone(), channel, reply)
            .in_guild(guild.into_boxed(), Member::new(author))
    }

    fn message(content: &str) -> (MessageEvent, Arc<BufferedReply>) {
        let reply = BufferedReply::new();
        (MessageEvent::new(content, source(reply.clone())), reply)
    }

    fn builder(config: HeraldConfig) -> RuntimeBuilder {
        HeraldRuntime::builder()
            .config(config)
            .init_logging(false)
            .command(
                CommandDefinition::builder("add")
                    .param(ParameterDefinition::of::<i64>("a"))
                    .param(ParameterDefinition::of::<i64>("b"))
                    .handler(add),
            )
    }

    #[tokio::test]
    async fn test_message_is_dispatched() {
        let lifecycle = DispatcherLifecycle::new();
        let runtime = builder(HeraldConfig::default()).build(&lifecycle).unwrap();
        let (event, reply) = message("!add 2 3");

        let outcome = runtime.handle_message(event).unwrap().await.unwrap();

        assert_eq!(outcome, Some(DispatchOutcome::Executed));
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("5"));
        assert_eq!(runtime.stats().executed, 1);
    }

    #[tokio::test]
    async fn test_unprefixed_message_is_ignored() {
        let lifecycle = DispatcherLifecycle::new();
        let runtime = builder(HeraldConfig::default()).build(&lifecycle).unwrap();
        let (event, reply) = message("add 2 3");

        assert!(runtime.handle_message(event).is_none());
        assert!(reply.sent().is_empty());
        assert_eq!(runtime.stats().ignored, 1);
    }

    #[tokio::test]
    async fn test_policy_drops_interactions() {
        let lifecycle = DispatcherLifecycle::new();
        let runtime = builder(HeraldConfig::default()).build(&lifecycle).unwrap();
        let reply = BufferedReply::new();
        let event = InteractionEvent::new("add", source(reply))
            .with_option("a", OptionData::Integer(1))
            .with_option("b", OptionData::Integer(2));

        assert!(runtime.handle_interaction(event).is_none());
    }

    #[tokio::test]
    async fn test_structured_policy() {
        let mut config = HeraldConfig::default();
        config.dispatch.policy = herald_framework::RoutingPolicy::Structured;
        let lifecycle = DispatcherLifecycle::new();
        let runtime = builder(config).build(&lifecycle).unwrap();

        let reply = BufferedReply::new();
        let event = InteractionEvent::new("add", source(reply.clone()))
            .with_option("a", OptionData::Integer(1))
            .with_option("b", OptionData::Integer(2));
        let outcome = runtime.handle_interaction(event).unwrap().await.unwrap();

        assert_eq!(outcome, Some(DispatchOutcome::Executed));
        assert_eq!(reply.acknowledged(), Some(false));
        let (text, _) = message("!add 1 2");
        assert!(runtime.handle_message(text).is_none());
    }

    #[tokio::test]
    async fn test_in_flight_bound() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let config = HeraldConfig {
            runtime: RuntimeConfig {
                max_in_flight: 1,
                ..Default::default()
            },
            ..Default::default()
        };

        let (c, p) = (current.clone(), peak.clone());
        let lifecycle = DispatcherLifecycle::new();
        let runtime = builder(config)
            .command(
                CommandDefinition::builder("slow").handler(move |_event: CommandEvent| {
                    let (current, peak) = (c.clone(), p.clone());
                    async move {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                    }
                }),
            )
            .build(&lifecycle)
            .unwrap();

        let handles: Vec<_> = (0..5)
            .filter_map(|_| runtime.handle_message(message("!slow").0))
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(DispatchOutcome::Executed));
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_events() {
        let lifecycle = DispatcherLifecycle::new();
        let runtime = builder(HeraldConfig::default()).build(&lifecycle).unwrap();

        runtime.shutdown().await;

        assert!(!runtime.is_running());
        assert!(runtime.handle_message(message("!add 1 1").0).is_none());
        assert_eq!(runtime.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_run_until_waits_for_in_flight() {
        let lifecycle = DispatcherLifecycle::new();
        let runtime = builder(HeraldConfig::default()).build(&lifecycle).unwrap();
        let (event, reply) = message("!add 20 22");
        let handle = runtime.handle_message(event).unwrap();

        runtime.run_until(async {}).await.unwrap();

        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("42"));
        assert_eq!(handle.await.unwrap(), Some(DispatchOutcome::Executed));
    }

    #[tokio::test]
    async fn test_second_runtime_is_rejected() {
        let lifecycle = DispatcherLifecycle::new();
        let first = builder(HeraldConfig::default()).build(&lifecycle).unwrap();

        let second = builder(HeraldConfig::default()).build(&lifecycle);
        assert!(matches!(
            second,
            Err(RuntimeError::Dispatch(DispatchError::AlreadyActive))
        ));

        drop(first);
        assert!(builder(HeraldConfig::default()).build(&lifecycle).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_catalog() {
        let lifecycle = DispatcherLifecycle::new();
        let result = builder(HeraldConfig::default())
            .command(CommandDefinition::builder("add").handler(add))
            .build(&lifecycle);

        assert!(matches!(result, Err(RuntimeError::Catalog(_))));
        assert!(!lifecycle.is_active());
    }

    #[tokio::test]
    async fn test_dispatcher_adapters_must_cover_catalog() {
        let lifecycle = DispatcherLifecycle::new();
        let result = builder(HeraldConfig::default())
            .dispatcher(|d| d.adapters(TypeAdapterRegistry::empty()))
            .build(&lifecycle);

        assert!(matches!(
            result,
            Err(RuntimeError::Dispatch(DispatchError::MissingAdapter { .. }))
        ));
        assert!(!lifecycle.is_active());
    }

    #[tokio::test]
    async fn test_invalid_config() {
        let mut config = HeraldConfig::default();
        config.runtime.max_in_flight = 0;
        let lifecycle = DispatcherLifecycle::new();

        assert!(matches!(
            builder(config).build(&lifecycle),
            Err(RuntimeError::Config(_))
        ));
    }
}
