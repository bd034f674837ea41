use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::Filter;
use crate::context::InvocationContext;
use crate::messages::ErrorMessageFactory;

/// Enforces per-user cooldowns on commands that declare one.
///
/// A successful pass starts the cooldown; invocations inside the window
/// are cancelled with the remaining time.
pub struct CooldownFilter {
    messages: Arc<dyn ErrorMessageFactory>,
    expiries: Mutex<HashMap<(u64, String), Instant>>,
}

impl CooldownFilter {
    pub fn new(messages: Arc<dyn ErrorMessageFactory>) -> Self {
        Self {
            messages,
            expiries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the time left if `user` is still cooling down on `command`,
    /// otherwise starts a new window.
    fn check_and_start(
        &self,
        user: u64,
        command: &str,
        cooldown: Duration,
        now: Instant,
    ) -> Option<Duration> {
        let mut expiries = self.expiries.lock();
        expiries.retain(|_, expires| *expires > now);

        let key = (user, command.to_string());
        if let Some(expires) = expiries.get(&key) {
            return Some(*expires - now);
        }
        expiries.insert(key, now + cooldown);
        None
    }
}

impl Filter for CooldownFilter {
    fn apply(&self, ctx: &mut InvocationContext) {
        let Some(command) = ctx.command() else {
            return;
        };
        let Some(cooldown) = command.cooldown() else {
            return;
        };
        let user = ctx.source().author().id;
        if let Some(remaining) = self.check_and_start(user, command.path(), cooldown, Instant::now())
        {
            let message = self.messages.cooldown(ctx, remaining);
            ctx.cancel(message);
        }
    }
}
