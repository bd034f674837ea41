use std::sync::Arc;

use super::Filter;
use crate::context::InvocationContext;
use crate::messages::ErrorMessageFactory;

/// Rejects direct-message invocations of commands that forbid them.
pub struct DirectMessageFilter {
    messages: Arc<dyn ErrorMessageFactory>,
}

impl DirectMessageFilter {
    pub fn new(messages: Arc<dyn ErrorMessageFactory>) -> Self {
        Self { messages }
    }
}

impl Filter for DirectMessageFilter {
    fn apply(&self, ctx: &mut InvocationContext) {
        let forbidden = ctx
            .command()
            .is_some_and(|c| !c.allows_dm() && !ctx.source().is_from_guild());
        if forbidden {
            let message = self.messages.wrong_channel_type(ctx);
            ctx.cancel(message);
        }
    }
}
