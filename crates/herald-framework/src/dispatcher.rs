//! The dispatch pipeline.
//!
//! A [`Dispatcher`] takes a parsed [`InvocationContext`] through the fixed
//! phase order:
//!
//! 1. `BeforeRouting` filters
//! 2. routing (not found or ambiguous ends the invocation)
//! 3. help requests are answered here and never reach binding
//! 4. structured options are projected into tokens
//! 5. `BeforeAdapting` filters
//! 6. argument binding
//! 7. `BeforeExecution` filters
//! 8. optional acknowledgement, then the handler
//!
//! Between phases the context's cancellation flag is checked; a cancelled
//! invocation gets its attached reply sent through the [`ReplySink`] and
//! stops. Handler errors and panics are caught at the handler boundary,
//! logged, and reported with an "execution failed" reply.
//!
//! ```rust,ignore
//! let lifecycle = DispatcherLifecycle::new();
//! let dispatcher = Dispatcher::builder(catalog)
//!     .adapters(adapters)
//!     .start(&lifecycle)?;
//!
//! let outcome = dispatcher.on_event(&mut ctx).await?;
//! ```

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tower::{BoxError, ServiceExt};
use tracing::{Instrument, Level, debug, error, span, trace};

use crate::adapter::TypeAdapterRegistry;
use crate::binder::ArgumentBinder;
use crate::catalog::CommandCatalog;
use crate::context::InvocationContext;
use crate::error::{DispatchError, DispatchResult, HandlerPanic};
use crate::filter::{DefaultPermissionsProvider, FilterPosition, FilterRegistry, PermissionsProvider};
use crate::handler::Invocation;
use crate::lifecycle::{ActivationToken, DispatcherLifecycle};
use crate::messages::{
    DefaultErrorMessageFactory, DefaultHelpMessageFactory, ErrorMessageFactory, HelpMessageFactory,
};
use crate::router::{CommandRouter, Router};
use crate::sender::{DefaultReplySink, ReplySink};

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran to completion.
    Executed,
    /// The handler returned an error or panicked.
    Failed,
    /// A phase cancelled the invocation.
    Cancelled,
    /// A help reply was sent.
    Help,
}

/// Runs invocations against a command catalog.
///
/// Cheap to share: wrap it in an `Arc` and call [`on_event`](Self::on_event)
/// from as many tasks as needed. The catalog and registries are read-only
/// while the dispatcher is alive.
pub struct Dispatcher {
    catalog: Arc<CommandCatalog>,
    adapters: Arc<TypeAdapterRegistry>,
    filters: FilterRegistry,
    router: Arc<dyn Router>,
    sink: Arc<dyn ReplySink>,
    errors: Arc<dyn ErrorMessageFactory>,
    help: Arc<dyn HelpMessageFactory>,
    _activation: ActivationToken,
}

impl Dispatcher {
    pub fn builder(catalog: CommandCatalog) -> DispatcherBuilder {
        DispatcherBuilder::new(catalog)
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn adapters(&self) -> &TypeAdapterRegistry {
        &self.adapters
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn error_messages(&self) -> &Arc<dyn ErrorMessageFactory> {
        &self.errors
    }

    pub fn reply_sink(&self) -> &Arc<dyn ReplySink> {
        &self.sink
    }

    /// Runs one invocation through the pipeline.
    ///
    /// User-facing failures end in [`DispatchOutcome::Cancelled`] with a
    /// reply already sent. An `Err` means the dispatcher itself is
    /// misconfigured.
    pub async fn on_event(&self, ctx: &mut InvocationContext) -> DispatchResult<DispatchOutcome> {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            author = ctx.source().author().id,
            channel = ctx.source().channel().id,
            structured = ctx.is_structured(),
        );
        self.run(ctx).instrument(span).await
    }

    async fn run(&self, ctx: &mut InvocationContext) -> DispatchResult<DispatchOutcome> {
        // Custom parsers may hand over an already rejected invocation.
        if ctx.is_cancelled() {
            return Ok(self.reply_cancelled(ctx));
        }

        if ctx.is_migrating() {
            let notice = self.errors.migration_notice(ctx);
            self.sink.send_error(ctx, notice);
        }

        debug!("Applying filters in phase BeforeRouting");
        self.filters.apply(FilterPosition::BeforeRouting, ctx);
        if ctx.is_cancelled() {
            return Ok(self.reply_cancelled(ctx));
        }

        self.router.find_command(ctx, &self.catalog);

        if ctx.command().is_none() {
            if ctx.is_help_event() {
                debug!("Sending generic help");
                let payload = self.help.generic_help(&self.catalog, ctx);
                self.sink.send_generic_help(ctx, payload);
                return Ok(DispatchOutcome::Help);
            }
            debug!(
                candidates = ctx.possible_commands().len(),
                "No unique command found"
            );
            let payload = self.errors.command_not_found(ctx);
            ctx.cancel(payload);
            return Ok(self.reply_cancelled(ctx));
        }

        if ctx.is_help_event() {
            debug!("Sending specific help");
            let payload = self.help.specific_help(ctx);
            self.sink.send_specific_help(ctx, payload);
            return Ok(DispatchOutcome::Help);
        }

        if ctx.is_structured() {
            ctx.project_options();
        }

        debug!("Applying filters in phase BeforeAdapting");
        self.filters.apply(FilterPosition::BeforeAdapting, ctx);
        if ctx.is_cancelled() {
            return Ok(self.reply_cancelled(ctx));
        }

        ArgumentBinder::new(&self.adapters, &*self.errors).bind(ctx)?;
        if ctx.is_cancelled() {
            return Ok(self.reply_cancelled(ctx));
        }

        debug!("Applying filters in phase BeforeExecution");
        self.filters.apply(FilterPosition::BeforeExecution, ctx);
        if ctx.is_cancelled() {
            return Ok(self.reply_cancelled(ctx));
        }

        Ok(self.execute(ctx).await)
    }

    async fn execute(&self, ctx: &InvocationContext) -> DispatchOutcome {
        let Some(command) = ctx.command() else {
            return DispatchOutcome::Cancelled;
        };
        // Routing only matches invocable commands.
        let Some(handler) = command.handler() else {
            return DispatchOutcome::Cancelled;
        };

        if ctx.is_structured() && command.auto_acknowledge() {
            trace!("Acknowledging interaction");
            ctx.source()
                .reply()
                .acknowledge(command.is_ephemeral());
        }

        debug!(command = command.path(), "Invoking command");
        let invocation = Invocation::new(ctx.arguments().to_vec());
        let result = AssertUnwindSafe(handler.clone().oneshot(invocation))
            .catch_unwind()
            .await;

        let failure: BoxError = match result {
            Ok(Ok(())) => return DispatchOutcome::Executed,
            Ok(Err(e)) => e,
            Err(panic) => Box::new(HandlerPanic(panic_message(panic.as_ref()))),
        };

        error!(
            command = command.path(),
            error = %error_chain(failure.as_ref()),
            "Command execution failed"
        );
        let payload = self.errors.execution_failed(ctx, failure.as_ref());
        self.sink.send_error(ctx, payload);
        DispatchOutcome::Failed
    }

    fn reply_cancelled(&self, ctx: &InvocationContext) -> DispatchOutcome {
        debug!("Invocation cancelled");
        if let Some(message) = ctx.error_message() {
            self.sink.send_error(ctx, message.clone());
        }
        DispatchOutcome::Cancelled
    }
}

fn check_adapters(catalog: &CommandCatalog, adapters: &TypeAdapterRegistry) -> DispatchResult<()> {
    for command in catalog.iter_all() {
        let missing = command
            .parameters()
            .iter()
            .map(|p| p.ty())
            .find(|ty| !ty.is_raw_array() && !adapters.exists(*ty));
        if let Some(ty) = missing {
            return Err(DispatchError::MissingAdapter {
                command: command.path().to_string(),
                ty: ty.to_string(),
            });
        }
    }
    Ok(())
}

/// `outer: cause: root cause`
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.catalog.len())
            .field("adapters", &self.adapters.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Dispatcher`]. Every collaborator has a default.
pub struct DispatcherBuilder {
    catalog: CommandCatalog,
    adapters: Option<Arc<TypeAdapterRegistry>>,
    filters: Option<FilterRegistry>,
    router: Arc<dyn Router>,
    sink: Arc<dyn ReplySink>,
    errors: Arc<dyn ErrorMessageFactory>,
    help: Arc<dyn HelpMessageFactory>,
    permissions: Arc<dyn PermissionsProvider>,
}

impl DispatcherBuilder {
    fn new(catalog: CommandCatalog) -> Self {
        Self {
            catalog,
            adapters: None,
            filters: None,
            router: Arc::new(CommandRouter),
            sink: Arc::new(DefaultReplySink),
            errors: Arc::new(DefaultErrorMessageFactory),
            help: Arc::new(DefaultHelpMessageFactory),
            permissions: Arc::new(DefaultPermissionsProvider),
        }
    }

    /// The adapters the catalog was validated against. Defaults to the
    /// built-in set.
    pub fn adapters(mut self, adapters: impl Into<Arc<TypeAdapterRegistry>>) -> Self {
        self.adapters = Some(adapters.into());
        self
    }

    /// Replaces the default filter chain entirely.
    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn router(mut self, router: impl Router + 'static) -> Self {
        self.router = Arc::new(router);
        self
    }

    pub fn reply_sink(mut self, sink: impl ReplySink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn error_messages(mut self, factory: impl ErrorMessageFactory + 'static) -> Self {
        self.errors = Arc::new(factory);
        self
    }

    pub fn help_messages(mut self, factory: impl HelpMessageFactory + 'static) -> Self {
        self.help = Arc::new(factory);
        self
    }

    /// Used by the default filter chain. Ignored when
    /// [`filters`](Self::filters) is set.
    pub fn permissions(mut self, provider: impl PermissionsProvider + 'static) -> Self {
        self.permissions = Arc::new(provider);
        self
    }

    /// Claims `lifecycle` and returns the running dispatcher.
    ///
    /// Fails with [`DispatchError::MissingAdapter`] if a catalog parameter
    /// type has no adapter in the registry the dispatcher will bind with.
    pub fn start(self, lifecycle: &DispatcherLifecycle) -> DispatchResult<Dispatcher> {
        let adapters = self
            .adapters
            .unwrap_or_else(|| Arc::new(TypeAdapterRegistry::new()));
        check_adapters(&self.catalog, &adapters)?;

        let activation = lifecycle.activate()?;
        let filters = self
            .filters
            .unwrap_or_else(|| FilterRegistry::with_defaults(self.errors.clone(), self.permissions));

        debug!(
            commands = self.catalog.len(),
            filters = filters.len(),
            "Dispatcher started"
        );
        Ok(Dispatcher {
            catalog: Arc::new(self.catalog),
            adapters,
            filters,
            router: self.router,
            sink: self.sink,
            errors: self.errors,
            help: self.help,
            _activation: activation,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use herald_core::{OptionData, OptionValue, ReplyKind, ReplyPayload};

    use super::*;
    use crate::catalog::{CatalogBuilder, CommandDefinition, ParameterDefinition};
    use crate::filter::Filter;
    use crate::handler::CommandEvent;
    use crate::settings::GuildSettings;
    use crate::testing::{MEMBER, MODERATOR, context_as, dm_source, guild_source};
    use crate::ValidatorRegistry;
    use herald_core::BufferedReply;

    async fn add(_event: CommandEvent, a: i64, b: i64) -> String {
        (a + b).to_string()
    }

    async fn boom(_event: CommandEvent) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("disk on fire"))
    }

    async fn explode(_event: CommandEvent) {
        panic!("kaboom");
    }

    async fn ban(event: CommandEvent, target: herald_core::Member) -> String {
        format!("{} banned {}", event.author().name, target.effective_name())
    }

    fn catalog(counter: Arc<AtomicUsize>) -> CommandCatalog {
        CatalogBuilder::new()
            .command(
                CommandDefinition::builder("add")
                    .param(ParameterDefinition::of::<i64>("a"))
                    .param(ParameterDefinition::of::<i64>("b"))
                    .handler(add),
            )
            .command(CommandDefinition::builder("boom").handler(boom))
            .command(CommandDefinition::builder("explode").handler(explode))
            .command(
                CommandDefinition::builder("ban")
                    .permission("ban_members")
                    .param(ParameterDefinition::of::<herald_core::Member>("target"))
                    .handler(ban),
            )
            .command(
                CommandDefinition::builder("count")
                    .cooldown(Duration::from_secs(60))
                    .handler(move |_event: CommandEvent| {
                        let counter = counter.clone();
                        async move {
                            counter.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
            )
            .command(
                CommandDefinition::builder("secret")
                    .ephemeral(true)
                    .dm(false)
                    .handler(|_event: CommandEvent| async { "shh" }),
            )
            .command(
                CommandDefinition::builder("daily")
                    .cooldown(Duration::from_secs(3600))
                    .dm(false)
                    .handler(|_event: CommandEvent| async { "claimed" }),
            )
            .command(
                CommandDefinition::builder("echo")
                    .param(ParameterDefinition::of::<String>("text").concat())
                    .handler(|_event: CommandEvent, text: String| async move { text }),
            )
            .build(&TypeAdapterRegistry::new(), &ValidatorRegistry::new())
            .unwrap()
    }

    fn dispatcher(lifecycle: &DispatcherLifecycle) -> (Dispatcher, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::builder(catalog(counter.clone()))
            .start(lifecycle)
            .unwrap();
        (dispatcher, counter)
    }

    fn titles(reply: &BufferedReply) -> Vec<Option<String>> {
        reply.sent().into_iter().map(|r| r.payload.title).collect()
    }

    #[test]
    fn test_error_chain_includes_sources() {
        #[derive(Debug, thiserror::Error)]
        #[error("could not load profile")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::other("disk on fire"));
        assert_eq!(error_chain(&err), "could not load profile: disk on fire");
    }

    #[tokio::test]
    async fn test_executes_handler() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let (mut ctx, reply) = context_as(MODERATOR, "add 2 40");

        let outcome = dispatcher.on_event(&mut ctx).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Executed);
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("42"));
    }

    #[tokio::test]
    async fn test_unknown_command_replies_not_found() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let (mut ctx, reply) = context_as(MODERATOR, "nope");

        let outcome = dispatcher.on_event(&mut ctx).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Cancelled);
        assert!(ctx.is_cancelled());
        let sent = reply.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload.kind, ReplyKind::Warning);
        assert_eq!(sent[0].payload.title.as_deref(), Some("Command Not Found"));
    }

    #[tokio::test]
    async fn test_syntax_error_skips_handler() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let (mut ctx, reply) = context_as(MODERATOR, "add 2 two");

        let outcome = dispatcher.on_event(&mut ctx).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Cancelled);
        assert_eq!(titles(&reply), [Some("Syntax Error".to_string())]);
    }

    #[tokio::test]
    async fn test_handler_error_is_reported() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let (mut ctx, reply) = context_as(MODERATOR, "boom");

        let outcome = dispatcher.on_event(&mut ctx).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Failed);
        let sent = reply.sent();
        assert_eq!(
            sent[0].payload.title.as_deref(),
            Some("Command Execution Failed")
        );
        assert!(sent[0].payload.description.contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let (mut ctx, reply) = context_as(MODERATOR, "explode");

        let outcome = dispatcher.on_event(&mut ctx).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(reply.sent()[0].payload.description.contains("kaboom"));

        // The dispatcher keeps serving.
        let (mut ctx, reply) = context_as(MODERATOR, "add 1 1");
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Executed
        );
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("2"));
    }

    #[tokio::test]
    async fn test_permissions_filter() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);

        let (mut ctx, reply) = context_as(MEMBER, "ban Cee");
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Cancelled
        );
        assert_eq!(titles(&reply), [Some("Insufficient Permissions".to_string())]);

        let (mut ctx, reply) = context_as(MODERATOR, "ban Cee");
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Executed
        );
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("alice banned Cee"));
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_run() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, counter) = dispatcher(&lifecycle);

        let (mut first, _) = context_as(MODERATOR, "count");
        let (mut second, reply) = context_as(MODERATOR, "count");
        dispatcher.on_event(&mut first).await.unwrap();
        let outcome = dispatcher.on_event(&mut second).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Cancelled);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(titles(&reply), [Some("Cooldown".to_string())]);
    }

    #[tokio::test]
    async fn test_direct_message_rejected() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let reply = BufferedReply::new();
        let mut ctx = InvocationContext::text(
            dm_source(MEMBER, reply.clone()),
            GuildSettings::default(),
            vec!["secret".to_string()],
        );

        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Cancelled
        );
        assert_eq!(titles(&reply), [Some("Wrong Channel Type".to_string())]);
    }

    #[tokio::test]
    async fn test_rejected_direct_message_does_not_start_cooldown() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let reply = BufferedReply::new();
        let mut ctx = InvocationContext::text(
            dm_source(MEMBER, reply.clone()),
            GuildSettings::default(),
            vec!["daily".to_string()],
        );
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Cancelled
        );
        assert_eq!(titles(&reply), [Some("Wrong Channel Type".to_string())]);

        let (mut ctx, reply) = context_as(MEMBER, "daily");
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Executed
        );
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("claimed"));
    }

    #[tokio::test]
    async fn test_help_events() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, counter) = dispatcher(&lifecycle);

        let (mut ctx, reply) = context_as(MODERATOR, "");
        ctx.set_help_event(true);
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Help
        );
        assert_eq!(titles(&reply), [Some("Command List".to_string())]);

        let (mut ctx, reply) = context_as(MODERATOR, "count");
        ctx.set_help_event(true);
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Help
        );
        assert_eq!(titles(&reply), [Some("Command Help: count".to_string())]);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_structured_invocation_is_acknowledged() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let reply = BufferedReply::new();
        let mut ctx = InvocationContext::structured(
            guild_source(MODERATOR, reply.clone()),
            GuildSettings::default(),
            "add",
            vec![
                OptionValue::new("b", OptionData::Integer(40)),
                OptionValue::new("a", OptionData::Integer(2)),
            ],
        );

        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Executed
        );
        assert_eq!(reply.acknowledged(), Some(false));
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("42"));
    }

    #[tokio::test]
    async fn test_ephemeral_structured_reply() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let reply = BufferedReply::new();
        let mut ctx = InvocationContext::structured(
            guild_source(MODERATOR, reply.clone()),
            GuildSettings::default(),
            "secret",
            Vec::new(),
        );

        dispatcher.on_event(&mut ctx).await.unwrap();

        assert_eq!(reply.acknowledged(), Some(true));
        assert!(reply.sent()[0].ephemeral);
    }

    #[tokio::test]
    async fn test_migrating_notice_then_execution() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let (mut ctx, reply) = context_as(MODERATOR, "add 1 2");
        ctx.set_migrating(true);

        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Executed
        );
        let sent = reply.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].payload.title.as_deref(), Some("Deprecated"));
        assert_eq!(sent[1].payload, ReplyPayload::text("3"));
    }

    #[tokio::test]
    async fn test_before_routing_cancel_skips_routing() {
        let lifecycle = DispatcherLifecycle::new();
        let mut filters = FilterRegistry::new();
        filters.register(
            FilterPosition::BeforeRouting,
            |ctx: &mut InvocationContext| {
                ctx.cancel(ReplyPayload::error("Closed", "Maintenance"));
            },
        );
        let dispatcher = Dispatcher::builder(catalog(Arc::new(AtomicUsize::new(0))))
            .filters(filters)
            .start(&lifecycle)
            .unwrap();
        let (mut ctx, reply) = context_as(MODERATOR, "add 1 2");

        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Cancelled
        );
        assert!(ctx.command().is_none());
        assert_eq!(titles(&reply), [Some("Closed".to_string())]);
    }

    struct Recorder {
        log: Arc<parking_lot::Mutex<Vec<&'static str>>>,
        label: &'static str,
        cancel: bool,
    }

    impl Filter for Recorder {
        fn apply(&self, ctx: &mut InvocationContext) {
            self.log.lock().push(self.label);
            if self.cancel {
                ctx.cancel(ReplyPayload::error("Closed", self.label));
            }
        }
    }

    /// One recording filter per phase; the one at `cancel_at` cancels.
    fn recorders(
        log: &Arc<parking_lot::Mutex<Vec<&'static str>>>,
        cancel_at: FilterPosition,
    ) -> FilterRegistry {
        let mut filters = FilterRegistry::new();
        for (position, label) in [
            (FilterPosition::BeforeRouting, "routing"),
            (FilterPosition::BeforeAdapting, "adapting"),
            (FilterPosition::BeforeExecution, "execution"),
        ] {
            filters.register(
                position,
                Recorder {
                    log: log.clone(),
                    label,
                    cancel: position == cancel_at,
                },
            );
        }
        filters
    }

    #[tokio::test]
    async fn test_cancel_stops_later_phases() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let lifecycle = DispatcherLifecycle::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::builder(catalog(counter.clone()))
            .filters(recorders(&log, FilterPosition::BeforeRouting))
            .start(&lifecycle)
            .unwrap();

        let (mut ctx, reply) = context_as(MODERATOR, "count");
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Cancelled
        );
        assert_eq!(*log.lock(), ["routing"]);
        assert!(ctx.command().is_none());
        assert!(ctx.arguments().is_empty());
        assert_eq!(titles(&reply), [Some("Closed".to_string())]);
        drop(dispatcher);

        log.lock().clear();
        let dispatcher = Dispatcher::builder(catalog(counter.clone()))
            .filters(recorders(&log, FilterPosition::BeforeAdapting))
            .start(&lifecycle)
            .unwrap();

        let (mut ctx, reply) = context_as(MODERATOR, "count");
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Cancelled
        );
        assert_eq!(*log.lock(), ["routing", "adapting"]);
        assert_eq!(ctx.command().map(|c| c.path()), Some("count"));
        // Binding never ran, so not even the command event is bound.
        assert!(ctx.arguments().is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(reply.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_structured_input_rewrite_reaches_handler() {
        let lifecycle = DispatcherLifecycle::new();
        let mut filters = FilterRegistry::new();
        filters.register(FilterPosition::BeforeAdapting, |ctx: &mut InvocationContext| {
            let upper = ctx.input().iter().map(|t| t.to_uppercase()).collect();
            ctx.set_input(upper);
        });
        let dispatcher = Dispatcher::builder(catalog(Arc::new(AtomicUsize::new(0))))
            .filters(filters)
            .start(&lifecycle)
            .unwrap();
        let reply = BufferedReply::new();
        let mut ctx = InvocationContext::structured(
            guild_source(MODERATOR, reply.clone()),
            GuildSettings::default(),
            "echo",
            vec![OptionValue::new("text", OptionData::String("hi".to_string()))],
        );

        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Executed
        );
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("HI"));
    }

    #[test]
    fn test_start_rejects_catalog_without_adapters() {
        use crate::handler::Arg;

        let mut adapters = TypeAdapterRegistry::new();
        adapters.register_fn(|raw: &str, _ctx: &InvocationContext| {
            raw.strip_suffix('%')?.parse().ok().map(Volume)
        });
        let catalog = || {
            CatalogBuilder::new()
                .command(
                    CommandDefinition::builder("volume")
                        .param(ParameterDefinition::of::<Volume>("level"))
                        .handler(|_event: CommandEvent, _level: Arg<Volume>| async {}),
                )
                .build(&adapters, &ValidatorRegistry::new())
                .unwrap()
        };
        let lifecycle = DispatcherLifecycle::new();

        let err = Dispatcher::builder(catalog()).start(&lifecycle).unwrap_err();
        assert!(matches!(err, DispatchError::MissingAdapter { ref command, .. } if command == "volume"));
        assert!(!lifecycle.is_active());

        let err = Dispatcher::builder(catalog())
            .adapters(TypeAdapterRegistry::empty())
            .start(&lifecycle)
            .unwrap_err();
        assert!(matches!(err, DispatchError::MissingAdapter { .. }));

        assert!(
            Dispatcher::builder(catalog())
                .adapters(adapters.clone())
                .start(&lifecycle)
                .is_ok()
        );
    }

    #[test]
    fn test_second_dispatcher_is_rejected() {
        let lifecycle = DispatcherLifecycle::new();
        let (first, _) = dispatcher(&lifecycle);
        let second = Dispatcher::builder(CommandCatalog::default()).start(&lifecycle);
        assert_eq!(second.unwrap_err(), DispatchError::AlreadyActive);

        drop(first);
        assert!(
            Dispatcher::builder(CommandCatalog::default())
                .start(&lifecycle)
                .is_ok()
        );
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Volume(u8);

    #[tokio::test]
    async fn test_custom_adapter_validator_and_layer() {
        use crate::handler::Arg;
        use crate::parser::{ParserSupervisor, RoutingPolicy};
        use crate::settings::StaticSettingsProvider;
        use herald_core::MessageEvent;
        use serde_json::{Value, json};
        use tower::util::MapRequestLayer;

        let mut adapters = TypeAdapterRegistry::new();
        adapters.register_fn(|raw: &str, _ctx: &InvocationContext| {
            raw.strip_suffix('%')?.parse().ok().map(Volume)
        });
        let mut validators = ValidatorRegistry::new();
        validators.register(
            "loudness",
            |argument: &crate::handler::Argument, config: &Value, _ctx: &InvocationContext| {
                let limit = config.as_u64().unwrap_or(100);
                argument
                    .downcast_ref::<Volume>()
                    .is_some_and(|v| u64::from(v.0) <= limit)
            },
        );

        let calls = Arc::new(AtomicUsize::new(0));
        let layer_calls = calls.clone();
        let catalog = CatalogBuilder::new()
            .command(
                CommandDefinition::builder("volume")
                    .param(
                        ParameterDefinition::of::<Volume>("level")
                            .constraint_with_message("loudness", json!(80), "Too loud"),
                    )
                    .layer(MapRequestLayer::new(move |invocation: Invocation| {
                        layer_calls.fetch_add(1, Ordering::SeqCst);
                        invocation
                    }))
                    .handler(|_event: CommandEvent, Arg(level): Arg<Volume>| async move {
                        format!("volume set to {}%", level.0)
                    }),
            )
            .build(&adapters, &validators)
            .unwrap();

        let lifecycle = DispatcherLifecycle::new();
        let dispatcher = Dispatcher::builder(catalog)
            .adapters(adapters)
            .start(&lifecycle)
            .unwrap();
        let supervisor = ParserSupervisor::new(
            RoutingPolicy::Text,
            Arc::new(StaticSettingsProvider::new(GuildSettings::default())),
            None,
        );

        let reply = BufferedReply::new();
        let event = MessageEvent::new("!volume 40%", guild_source(MODERATOR, reply.clone()));
        let mut ctx = supervisor.parse(event.into()).unwrap();
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Executed
        );
        assert_eq!(reply.sent()[0].payload, ReplyPayload::text("volume set to 40%"));

        let reply = BufferedReply::new();
        let event = MessageEvent::new("!volume 95%", guild_source(MODERATOR, reply.clone()));
        let mut ctx = supervisor.parse(event.into()).unwrap();
        assert_eq!(
            dispatcher.on_event(&mut ctx).await.unwrap(),
            DispatchOutcome::Cancelled
        );
        assert_eq!(reply.sent()[0].payload.description, "`Too loud`");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_isolated() {
        let lifecycle = DispatcherLifecycle::new();
        let (dispatcher, _) = dispatcher(&lifecycle);
        let dispatcher = Arc::new(dispatcher);

        let tasks: Vec<_> = (0..64i64)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let input = if i % 4 == 0 {
                        format!("add {i} oops")
                    } else {
                        format!("add {i} {i}")
                    };
                    let (mut ctx, reply) = context_as(MODERATOR, &input);
                    let outcome = dispatcher.on_event(&mut ctx).await.unwrap();
                    (i, outcome, reply.sent())
                })
            })
            .collect();

        for task in tasks {
            let (i, outcome, sent) = task.await.unwrap();
            assert_eq!(sent.len(), 1);
            if i % 4 == 0 {
                assert_eq!(outcome, DispatchOutcome::Cancelled);
                assert_eq!(sent[0].payload.title.as_deref(), Some("Syntax Error"));
            } else {
                assert_eq!(outcome, DispatchOutcome::Executed);
                assert_eq!(sent[0].payload, ReplyPayload::text((i * 2).to_string()));
            }
        }
    }
}
