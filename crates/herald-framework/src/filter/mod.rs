//! The filter chain.
//!
//! Filters run at three fixed points of the pipeline:
//!
//! 1. [`FilterPosition::BeforeRouting`]: only the raw input is known
//!    (mute checks).
//! 2. [`FilterPosition::BeforeAdapting`]: the command is known, arguments
//!    are not (input rewriting).
//! 3. [`FilterPosition::BeforeExecution`]: arguments are bound
//!    (permissions, channel checks, cooldowns).
//!
//! Within a position, filters run in registration order and the first one
//! to cancel the invocation ends the phase.

mod cooldown;
mod direct_message;
mod mute;
mod permissions;

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::context::InvocationContext;
use crate::messages::ErrorMessageFactory;

pub use cooldown::CooldownFilter;
pub use direct_message::DirectMessageFilter;
pub use mute::{ChannelMuteFilter, GuildMuteFilter, UserMuteFilter};
pub use permissions::{DefaultPermissionsProvider, PermissionsFilter, PermissionsProvider};

/// Where in the pipeline a filter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPosition {
    BeforeRouting,
    BeforeAdapting,
    BeforeExecution,
}

/// Inspects an invocation and may cancel it.
pub trait Filter: Send + Sync {
    /// Cancel through [`InvocationContext::cancel`] to stop the invocation.
    fn apply(&self, ctx: &mut InvocationContext);

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<F> Filter for F
where
    F: Fn(&mut InvocationContext) + Send + Sync,
{
    fn apply(&self, ctx: &mut InvocationContext) {
        self(ctx)
    }
}

struct RegisteredFilter {
    position: FilterPosition,
    type_id: TypeId,
    filter: Arc<dyn Filter>,
}

/// Filters by position, in registration order.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: Vec<Arc<RegisteredFilter>>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in filters: user, guild and channel mutes before routing;
    /// permissions, direct-message checks and cooldowns before execution.
    pub fn with_defaults(
        messages: Arc<dyn ErrorMessageFactory>,
        permissions: Arc<dyn PermissionsProvider>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(
            FilterPosition::BeforeRouting,
            UserMuteFilter::new(messages.clone(), permissions.clone()),
        );
        registry.register(
            FilterPosition::BeforeRouting,
            GuildMuteFilter::new(messages.clone()),
        );
        registry.register(
            FilterPosition::BeforeRouting,
            ChannelMuteFilter::new(messages.clone()),
        );
        registry.register(
            FilterPosition::BeforeExecution,
            PermissionsFilter::new(messages.clone(), permissions),
        );
        registry.register(
            FilterPosition::BeforeExecution,
            DirectMessageFilter::new(messages.clone()),
        );
        // Last, so a rejected invocation never starts a window.
        registry.register(
            FilterPosition::BeforeExecution,
            CooldownFilter::new(messages),
        );
        registry
    }

    /// Appends `filter` to the chain at `position`.
    pub fn register<F: Filter + Any>(&mut self, position: FilterPosition, filter: F) {
        self.filters.push(Arc::new(RegisteredFilter {
            position,
            type_id: TypeId::of::<F>(),
            filter: Arc::new(filter),
        }));
    }

    /// Removes every registered filter of type `F`.
    pub fn unregister<F: Filter + Any>(&mut self) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| f.type_id != TypeId::of::<F>());
        self.filters.len() != before
    }

    /// Filters registered at `position`, in order.
    pub fn get(&self, position: FilterPosition) -> impl Iterator<Item = &Arc<dyn Filter>> {
        self.filters
            .iter()
            .filter(move |f| f.position == position)
            .map(|f| &f.filter)
    }

    /// Every filter, in order.
    pub fn get_all(&self) -> impl Iterator<Item = (FilterPosition, &Arc<dyn Filter>)> {
        self.filters.iter().map(|f| (f.position, &f.filter))
    }

    /// Runs the chain at `position`, stopping at the first cancellation.
    pub fn apply(&self, position: FilterPosition, ctx: &mut InvocationContext) {
        for filter in self.get(position) {
            if ctx.is_cancelled() {
                break;
            }
            filter.apply(ctx);
            if ctx.is_cancelled() {
                debug!(filter = filter.name(), ?position, "Invocation cancelled by filter");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|r| (r.position, r.filter.name())))
            .finish()
    }
}
