//! Delivery of pipeline-generated replies.

use herald_core::ReplyPayload;
use tracing::trace;

use crate::context::InvocationContext;

/// Sends help and error replies for an invocation.
///
/// Replies are fire-and-forget; delivery problems are the platform's.
pub trait ReplySink: Send + Sync {
    fn send_generic_help(&self, ctx: &InvocationContext, payload: ReplyPayload);

    fn send_specific_help(&self, ctx: &InvocationContext, payload: ReplyPayload);

    fn send_error(&self, ctx: &InvocationContext, payload: ReplyPayload);
}

/// Replies through the event's own reply callback. Errors on ephemeral
/// commands stay ephemeral for structured input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReplySink;

impl DefaultReplySink {
    fn ephemeral(ctx: &InvocationContext) -> bool {
        ctx.is_structured() && ctx.command().is_some_and(|c| c.is_ephemeral())
    }
}

impl ReplySink for DefaultReplySink {
    fn send_generic_help(&self, ctx: &InvocationContext, payload: ReplyPayload) {
        trace!("Sending generic help");
        ctx.source().reply().reply(payload, false);
    }

    fn send_specific_help(&self, ctx: &InvocationContext, payload: ReplyPayload) {
        trace!("Sending specific help");
        ctx.source().reply().reply(payload, Self::ephemeral(ctx));
    }

    fn send_error(&self, ctx: &InvocationContext, payload: ReplyPayload) {
        trace!(title = ?payload.title, "Sending error message");
        ctx.source().reply().reply(payload, Self::ephemeral(ctx));
    }
}
