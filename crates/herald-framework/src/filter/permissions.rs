use std::sync::Arc;

use herald_core::User;

use super::Filter;
use crate::context::InvocationContext;
use crate::messages::ErrorMessageFactory;

/// Decides who may run what.
pub trait PermissionsProvider: Send + Sync {
    /// Muted users cannot run any command.
    fn is_muted(&self, _user: &User, _ctx: &InvocationContext) -> bool {
        false
    }

    /// Whether the invoking user holds `permission`.
    fn has_permission(&self, ctx: &InvocationContext, permission: &str) -> bool;
}

/// Checks permission tags against the invoking member. Outside a guild no
/// permission is held.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPermissionsProvider;

impl PermissionsProvider for DefaultPermissionsProvider {
    fn has_permission(&self, ctx: &InvocationContext, permission: &str) -> bool {
        ctx.source()
            .member()
            .is_some_and(|m| m.has_permission(permission))
    }
}

/// Cancels unless the user holds every permission the command requires.
pub struct PermissionsFilter {
    messages: Arc<dyn ErrorMessageFactory>,
    permissions: Arc<dyn PermissionsProvider>,
}

impl PermissionsFilter {
    pub fn new(
        messages: Arc<dyn ErrorMessageFactory>,
        permissions: Arc<dyn PermissionsProvider>,
    ) -> Self {
        Self {
            messages,
            permissions,
        }
    }
}

impl Filter for PermissionsFilter {
    fn apply(&self, ctx: &mut InvocationContext) {
        let Some(command) = ctx.command() else {
            return;
        };
        let allowed = command
            .permissions()
            .iter()
            .all(|p| self.permissions.has_permission(ctx, p));
        if !allowed {
            let message = self.messages.insufficient_permissions(ctx);
            ctx.cancel(message);
        }
    }
}
