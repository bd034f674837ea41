//! Shared fixtures for unit tests.

use std::sync::Arc;

use herald_core::{
    BufferedReply, Channel, ChannelType, EventSource, Guild, Member, MemoryGuild, Role, User,
};

use crate::context::InvocationContext;
use crate::settings::GuildSettings;

pub(crate) const GUILD_ID: u64 = 1;
pub(crate) const MODERATOR: u64 = 100;
pub(crate) const MEMBER: u64 = 101;
pub(crate) const GENERAL: u64 = 300;

pub(crate) fn test_guild() -> MemoryGuild {
    let moderator_role = Role::new(500, "Moderator");
    MemoryGuild::new(GUILD_ID, "Herald Test")
        .with_member(
            Member::new(User::new(MODERATOR, "alice"))
                .with_role(moderator_role.clone())
                .with_permission("ban_members")
                .with_permission("kick_members"),
        )
        .with_member(Member::new(User::new(MEMBER, "bob")))
        .with_member(Member::new(User::new(102, "carol")).with_nickname("Cee"))
        .with_role(moderator_role)
        .with_role(Role::new(501, "Member"))
        .with_channel(Channel::new(GENERAL, "general", ChannelType::Text))
        .with_channel(Channel::new(301, "news", ChannelType::News))
        .with_channel(Channel::new(302, "lounge", ChannelType::Voice))
        .with_channel(Channel::new(303, "stage", ChannelType::Stage))
        .with_channel(Channel::new(304, "thread", ChannelType::Thread))
}

pub(crate) fn tokens(content: &str) -> Vec<String> {
    content.split_whitespace().map(str::to_string).collect()
}

/// A source inside the test guild, authored by `user_id`.
pub(crate) fn guild_source(user_id: u64, reply: Arc<BufferedReply>) -> EventSource {
    let guild = test_guild();
    let member = guild
        .member_by_id(user_id)
        .unwrap_or_else(|| Member::new(User::new(user_id, "stranger")));
    let channel = guild.channel_by_id(GENERAL).unwrap();
    EventSource::new(member.user.clone(), channel, reply).in_guild(guild.into_boxed(), member)
}

/// A direct-message source.
pub(crate) fn dm_source(user_id: u64, reply: Arc<BufferedReply>) -> EventSource {
    EventSource::new(User::new(user_id, "dm-user"), Channel::private(900), reply)
}

/// A text invocation by the moderator in `#general`.
pub(crate) fn guild_context(content: &str) -> InvocationContext {
    context_as(MODERATOR, content).0
}

pub(crate) fn context_as(user_id: u64, content: &str) -> (InvocationContext, Arc<BufferedReply>) {
    let reply = BufferedReply::new();
    let ctx = InvocationContext::text(
        guild_source(user_id, reply.clone()),
        GuildSettings::default(),
        tokens(content),
    );
    (ctx, reply)
}
