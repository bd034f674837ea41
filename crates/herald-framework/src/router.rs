//! Command lookup.
//!
//! The router walks the leading input tokens down the catalog tree: the
//! first token selects a top-level command, and while the selected command
//! has sub-commands and tokens remain, the next token selects among them.
//! Consumed tokens are removed from the input, so the binder only sees
//! arguments.

use std::sync::Arc;

use tracing::trace;

use crate::catalog::{CommandCatalog, CommandDefinition};
use crate::context::InvocationContext;

/// Result of a lookup.
#[derive(Debug, Clone)]
pub enum Route {
    /// Exactly one invocable command, and how many tokens named it.
    Matched {
        command: Arc<CommandDefinition>,
        consumed: usize,
    },
    /// More than one command claims the label.
    Ambiguous(Vec<Arc<CommandDefinition>>),
    /// Nothing matched.
    NotFound,
}

/// Resolves the command an invocation refers to.
pub trait Router: Send + Sync {
    /// Sets the matched command (consuming its label tokens) or the list
    /// of ambiguous candidates. Leaves the context untouched if nothing
    /// matched.
    fn find_command(&self, ctx: &mut InvocationContext, catalog: &CommandCatalog);
}

/// Label and alias matching over the catalog tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRouter;

impl CommandRouter {
    /// Looks up `tokens` in `catalog`.
    pub fn route(&self, catalog: &CommandCatalog, tokens: &[String], ignore_case: bool) -> Route {
        resolve(catalog.commands(), tokens, ignore_case)
    }
}

fn resolve(level: &[Arc<CommandDefinition>], tokens: &[String], ignore_case: bool) -> Route {
    let Some(label) = tokens.first() else {
        return Route::NotFound;
    };
    let mut candidates: Vec<_> = level
        .iter()
        .filter(|c| c.matches(label, ignore_case))
        .cloned()
        .collect();

    if candidates.len() > 1 {
        return Route::Ambiguous(candidates);
    }
    let Some(command) = candidates.pop() else {
        return Route::NotFound;
    };

    if command.has_sub_commands() && tokens.len() > 1 {
        match resolve(command.sub_commands(), &tokens[1..], ignore_case) {
            Route::Matched { command, consumed } => {
                return Route::Matched {
                    command,
                    consumed: consumed + 1,
                };
            }
            Route::Ambiguous(candidates) => return Route::Ambiguous(candidates),
            // Remaining tokens are arguments of the parent.
            Route::NotFound => {}
        }
    }

    if command.is_invocable() {
        Route::Matched {
            command,
            consumed: 1,
        }
    } else {
        Route::NotFound
    }
}

impl Router for CommandRouter {
    fn find_command(&self, ctx: &mut InvocationContext, catalog: &CommandCatalog) {
        // Structured names are exact by construction.
        let ignore_case = !ctx.is_structured() && ctx.settings().ignore_case;
        match self.route(catalog, ctx.input(), ignore_case) {
            Route::Matched { command, consumed } => {
                trace!(command = command.path(), consumed, "Command matched");
                let rest = ctx.input()[consumed..].to_vec();
                ctx.set_input(rest);
                ctx.set_command(command);
            }
            Route::Ambiguous(candidates) => {
                trace!(count = candidates.len(), "Ambiguous command label");
                ctx.set_possible_commands(candidates);
            }
            Route::NotFound => trace!("No command matched"),
        }
    }
}
