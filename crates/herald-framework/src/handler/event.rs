//! The event handed to every command handler.

use std::fmt;
use std::sync::Arc;

use herald_core::{BoxedGuild, Channel, EventSource, Member, ReplyPayload, User};

use super::argument::{Argument, FromArgument};
use crate::catalog::CommandDefinition;
use crate::context::{InputKind, InvocationContext};
use crate::error::ArgumentError;

/// The invoked command and where it was invoked from.
///
/// Always the first bound argument, and so always the first handler
/// parameter.
#[derive(Clone)]
pub struct CommandEvent {
    command: Arc<CommandDefinition>,
    source: EventSource,
    kind: InputKind,
    prefix: String,
}

impl CommandEvent {
    pub(crate) fn new(ctx: &InvocationContext, command: Arc<CommandDefinition>) -> Self {
        Self {
            command,
            source: ctx.source().clone(),
            kind: ctx.kind(),
            prefix: ctx.contextual_prefix().to_string(),
        }
    }

    pub fn command(&self) -> &CommandDefinition {
        &self.command
    }

    pub fn source(&self) -> &EventSource {
        &self.source
    }

    pub fn author(&self) -> &User {
        self.source.author()
    }

    /// `None` in direct messages.
    pub fn member(&self) -> Option<&Member> {
        self.source.member()
    }

    pub fn channel(&self) -> &Channel {
        self.source.channel()
    }

    pub fn guild(&self) -> Option<&BoxedGuild> {
        self.source.guild()
    }

    pub fn is_structured(&self) -> bool {
        self.kind == InputKind::Structured
    }

    pub fn contextual_prefix(&self) -> &str {
        &self.prefix
    }

    /// Replies in the originating channel. Structured invocations of an
    /// ephemeral command reply ephemerally.
    pub fn reply(&self, payload: impl Into<ReplyPayload>) {
        let ephemeral = self.is_structured() && self.command.is_ephemeral();
        self.source.reply().reply(payload.into(), ephemeral);
    }

    /// Replies visible only to the invoking user, where supported.
    pub fn reply_ephemeral(&self, payload: impl Into<ReplyPayload>) {
        self.source.reply().reply(payload.into(), true);
    }
}

impl FromArgument for CommandEvent {
    fn from_argument(argument: Argument, position: usize) -> Result<Self, ArgumentError> {
        argument.take(position)
    }
}

impl fmt::Debug for CommandEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEvent")
            .field("command", &self.command.path())
            .field("source", &self.source)
            .field("kind", &self.kind)
            .finish()
    }
}
