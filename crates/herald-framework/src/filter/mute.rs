use std::sync::Arc;

use super::{Filter, PermissionsProvider};
use crate::context::InvocationContext;
use crate::messages::ErrorMessageFactory;

/// Rejects users the permissions provider reports as muted.
pub struct UserMuteFilter {
    messages: Arc<dyn ErrorMessageFactory>,
    permissions: Arc<dyn PermissionsProvider>,
}

impl UserMuteFilter {
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

impl Filter for UserMuteFilter {
    fn apply(&self, ctx: &mut InvocationContext) {
        if self.permissions.is_muted(ctx.source().author(), ctx) {
            let message = self.messages.user_muted(ctx);
            ctx.cancel(message);
        }
    }
}

/// Rejects everything from a guild whose settings mark it muted.
pub struct GuildMuteFilter {
    messages: Arc<dyn ErrorMessageFactory>,
}

impl GuildMuteFilter {
    pub fn new(messages: Arc<dyn ErrorMessageFactory>) -> Self {
        Self { messages }
    }
}

impl Filter for GuildMuteFilter {
    fn apply(&self, ctx: &mut InvocationContext) {
        if ctx.source().is_from_guild() && ctx.settings().muted {
            let message = self.messages.guild_muted(ctx);
            ctx.cancel(message);
        }
    }
}

/// Rejects invocations in channels listed as muted.
pub struct ChannelMuteFilter {
    messages: Arc<dyn ErrorMessageFactory>,
}

impl ChannelMuteFilter {
    pub fn new(messages: Arc<dyn ErrorMessageFactory>) -> Self {
        Self { messages }
    }
}

impl Filter for ChannelMuteFilter {
    fn apply(&self, ctx: &mut InvocationContext) {
        let channel = ctx.source().channel().id;
        if ctx.settings().muted_channels.contains(&channel) {
            let message = self.messages.channel_muted(ctx);
            ctx.cancel(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DefaultPermissionsProvider;
    use crate::messages::DefaultErrorMessageFactory;
    use crate::settings::GuildSettings;
    use crate::testing::{GENERAL, MEMBER, guild_source};
    use herald_core::{BufferedReply, User};

    struct MutedBob;

    impl PermissionsProvider for MutedBob {
        fn is_muted(&self, user: &User, _ctx: &InvocationContext) -> bool {
            user.id == MEMBER
        }

        fn has_permission(&self, ctx: &InvocationContext, permission: &str) -> bool {
            DefaultPermissionsProvider.has_permission(ctx, permission)
        }
    }

    fn ctx_with(user: u64, settings: GuildSettings) -> InvocationContext {
        InvocationContext::text(
            guild_source(user, BufferedReply::new()),
            settings,
            vec!["ping".into()],
        )
    }

    #[test]
    fn test_user_mute() {
        let filter = UserMuteFilter::new(Arc::new(DefaultErrorMessageFactory), Arc::new(MutedBob));

        let mut ctx = ctx_with(MEMBER, GuildSettings::default());
        filter.apply(&mut ctx);
        assert_eq!(ctx.error_message().unwrap().description, "You are muted!");

        let mut ctx = ctx_with(100, GuildSettings::default());
        filter.apply(&mut ctx);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_guild_and_channel_mute() {
        let messages: Arc<dyn ErrorMessageFactory> = Arc::new(DefaultErrorMessageFactory);

        let mut ctx = ctx_with(
            MEMBER,
            GuildSettings {
                muted: true,
                ..Default::default()
            },
        );
        GuildMuteFilter::new(messages.clone()).apply(&mut ctx);
        assert_eq!(ctx.error_message().unwrap().description, "This guild is muted!");

        let mut settings = GuildSettings::default();
        settings.muted_channels.insert(GENERAL);
        let mut ctx = ctx_with(MEMBER, settings);
        ChannelMuteFilter::new(messages).apply(&mut ctx);
        assert_eq!(ctx.error_message().unwrap().description, "This channel is muted!");
    }
}
