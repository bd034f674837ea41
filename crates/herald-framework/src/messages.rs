//! User-facing error and help messages.
//!
//! Every reply the pipeline produces on its own, as opposed to replies a
//! handler sends, comes from an [`ErrorMessageFactory`] or a
//! [`HelpMessageFactory`]. Swap either to change wording or layout.

use std::error::Error;
use std::time::Duration;

use herald_core::ReplyPayload;

use crate::catalog::{CommandCatalog, CommandDefinition, ConstraintDefinition};
use crate::context::InvocationContext;

/// Builds the reply for each kind of rejected invocation.
pub trait ErrorMessageFactory: Send + Sync {
    fn command_not_found(&self, ctx: &InvocationContext) -> ReplyPayload;

    fn insufficient_permissions(&self, ctx: &InvocationContext) -> ReplyPayload;

    fn guild_muted(&self, ctx: &InvocationContext) -> ReplyPayload;

    fn channel_muted(&self, ctx: &InvocationContext) -> ReplyPayload;

    fn user_muted(&self, ctx: &InvocationContext) -> ReplyPayload;

    fn syntax_error(&self, ctx: &InvocationContext) -> ReplyPayload;

    fn constraint_failed(
        &self,
        ctx: &InvocationContext,
        constraint: &ConstraintDefinition,
    ) -> ReplyPayload;

    fn cooldown(&self, ctx: &InvocationContext, remaining: Duration) -> ReplyPayload;

    fn wrong_channel_type(&self, ctx: &InvocationContext) -> ReplyPayload;

    fn execution_failed(
        &self,
        ctx: &InvocationContext,
        error: &(dyn Error + Send + Sync + 'static),
    ) -> ReplyPayload;

    /// Sent alongside free-text invocations once text commands are retired.
    fn migration_notice(&self, ctx: &InvocationContext) -> ReplyPayload;
}

/// The stock English messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorMessageFactory;

impl ErrorMessageFactory for DefaultErrorMessageFactory {
    fn command_not_found(&self, ctx: &InvocationContext) -> ReplyPayload {
        let mut payload = ReplyPayload::warning(
            "Command Not Found",
            format!(
                "Type `{}{}` to get a list of all available commands",
                ctx.contextual_prefix(),
                ctx.settings().help_label()
            ),
        );
        if !ctx.possible_commands().is_empty() {
            let similar = ctx
                .possible_commands()
                .iter()
                .map(|c| format!("`{}`", c.path()))
                .collect::<Vec<_>>()
                .join("\n");
            payload = payload.field("Similar Commands", similar);
        }
        payload
    }

    fn insufficient_permissions(&self, ctx: &InvocationContext) -> ReplyPayload {
        let Some(command) = ctx.command() else {
            return ReplyPayload::error(
                "Insufficient Permissions",
                "You are not allowed to execute this command",
            );
        };
        ReplyPayload::error(
            "Insufficient Permissions",
            format!(
                "`{}{}` requires specific permissions to be executed",
                ctx.contextual_prefix(),
                command.path()
            ),
        )
        .field("Permissions", format!("`{}`", command.permissions().join(", ")))
    }

    fn guild_muted(&self, _ctx: &InvocationContext) -> ReplyPayload {
        ReplyPayload::error("Insufficient Permissions", "This guild is muted!")
    }

    fn channel_muted(&self, _ctx: &InvocationContext) -> ReplyPayload {
        ReplyPayload::error("Insufficient Permissions", "This channel is muted!")
    }

    fn user_muted(&self, _ctx: &InvocationContext) -> ReplyPayload {
        ReplyPayload::error("Insufficient Permissions", "You are muted!")
    }

    fn syntax_error(&self, ctx: &InvocationContext) -> ReplyPayload {
        let Some(command) = ctx.command() else {
            return ReplyPayload::error("Syntax Error", "The input could not be parsed.");
        };
        let expected = command
            .parameters()
            .iter()
            .map(|p| p.ty().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let actual = ctx.input().join(", ");
        ReplyPayload::error(
            "Syntax Error",
            format!("Usage: `{}`", command.usage_with_prefix(ctx.contextual_prefix())),
        )
        .field("Expected", or_none(expected))
        .field("Actual", or_none(actual))
    }

    fn constraint_failed(
        &self,
        _ctx: &InvocationContext,
        constraint: &ConstraintDefinition,
    ) -> ReplyPayload {
        ReplyPayload::error("Parameter Error", format!("`{}`", constraint.message()))
    }

    fn cooldown(&self, _ctx: &InvocationContext, remaining: Duration) -> ReplyPayload {
        ReplyPayload::error(
            "Cooldown",
            format!("You cannot use this command for {}!", format_duration(remaining)),
        )
    }

    fn wrong_channel_type(&self, _ctx: &InvocationContext) -> ReplyPayload {
        ReplyPayload::error(
            "Wrong Channel Type",
            "This command cannot be executed in this type of channel!",
        )
    }

    fn execution_failed(
        &self,
        _ctx: &InvocationContext,
        error: &(dyn Error + Send + Sync + 'static),
    ) -> ReplyPayload {
        ReplyPayload::error("Command Execution Failed", format!("```{error}```"))
    }

    fn migration_notice(&self, _ctx: &InvocationContext) -> ReplyPayload {
        ReplyPayload::warning(
            "Deprecated",
            "Text commands have been disabled. This command is now only available as a slash command. Type `/` to see a list of all available commands!",
        )
    }
}

fn or_none(text: String) -> String {
    if text.is_empty() {
        "None".to_string()
    } else {
        text
    }
}

/// `h:mm:ss`, rounding partial seconds up.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

// ============================================================================
// Help
// ============================================================================

/// Builds help replies.
pub trait HelpMessageFactory: Send + Sync {
    /// Overview of every command.
    fn generic_help(&self, catalog: &CommandCatalog, ctx: &InvocationContext) -> ReplyPayload;

    /// Details of the command in `ctx`.
    fn specific_help(&self, ctx: &InvocationContext) -> ReplyPayload;
}

/// Lists commands grouped by category.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHelpMessageFactory;

impl HelpMessageFactory for DefaultHelpMessageFactory {
    fn generic_help(&self, catalog: &CommandCatalog, ctx: &InvocationContext) -> ReplyPayload {
        let prefix = ctx.contextual_prefix();
        let mut payload = ReplyPayload::text(format!(
            "To view detailed information for a command type `{prefix}{} <command>`",
            ctx.settings().help_label()
        ))
        .with_title("Command List");

        let mut categories: Vec<&str> = Vec::new();
        for command in catalog.commands() {
            if !categories.contains(&command.category()) {
                categories.push(command.category());
            }
        }
        for category in categories {
            let labels = catalog
                .commands()
                .iter()
                .filter(|c| c.category() == category)
                .map(|c| format!("`{prefix}{}`", c.name()))
                .collect::<Vec<_>>()
                .join(", ");
            payload = payload.field(category, labels);
        }
        payload
    }

    fn specific_help(&self, ctx: &InvocationContext) -> ReplyPayload {
        let Some(command) = ctx.command() else {
            return ReplyPayload::text("No help available.");
        };
        describe(command, ctx.contextual_prefix())
    }
}

fn describe(command: &CommandDefinition, prefix: &str) -> ReplyPayload {
    let description = if command.description().is_empty() {
        "No description provided.".to_string()
    } else {
        command.description().to_string()
    };
    let mut payload = ReplyPayload::text(description)
        .with_title(format!("Command Help: {}", command.path()))
        .field("Usage", format!("`{}`", command.usage_with_prefix(prefix)));

    if command.labels().len() > 1 {
        payload = payload.field("Aliases", command.labels()[1..].join(", "));
    }
    if command.has_sub_commands() {
        let subs = command
            .sub_commands()
            .iter()
            .map(|s| format!("`{}`", s.name()))
            .collect::<Vec<_>>()
            .join(", ");
        payload = payload.field("Sub Commands", subs);
    }
    if !command.permissions().is_empty() {
        payload = payload.field("Permissions", command.permissions().join(", "));
    }
    payload
}
