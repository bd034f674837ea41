//! Adapters for platform entities.
//!
//! A token resolves by id when it is all digits (after stripping mention
//! markup), otherwise by case-insensitive name, taking the first match.
//! Everything except [`UserAdapter`] needs a guild and fails in direct
//! messages.

use std::marker::PhantomData;

use herald_core::{
    AudioChannel, Channel, Member, NewsChannel, Role, StageChannel, TextChannel, ThreadChannel,
    User, VoiceChannel, sanitize_mention,
};

use super::TypeAdapter;
use crate::context::InvocationContext;

enum Lookup<'a> {
    Id(u64),
    Name(&'a str),
}

fn lookup(raw: &str) -> Lookup<'_> {
    let raw = sanitize_mention(raw);
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(id) = raw.parse() {
            return Lookup::Id(id);
        }
    }
    Lookup::Name(raw)
}

pub(crate) fn resolve_member(raw: &str, ctx: &InvocationContext) -> Option<Member> {
    let guild = ctx.source().guild()?;
    match lookup(raw) {
        Lookup::Id(id) => guild.member_by_id(id),
        Lookup::Name(name) => guild.members_by_name(name).into_iter().next(),
    }
}

pub(crate) fn resolve_role(raw: &str, ctx: &InvocationContext) -> Option<Role> {
    let guild = ctx.source().guild()?;
    match lookup(raw) {
        Lookup::Id(id) => guild.role_by_id(id),
        Lookup::Name(name) => guild.roles_by_name(name).into_iter().next(),
    }
}

fn resolve_channel(raw: &str, ctx: &InvocationContext) -> Option<Channel> {
    let guild = ctx.source().guild()?;
    match lookup(raw) {
        Lookup::Id(id) => guild.channel_by_id(id),
        Lookup::Name(name) => guild.channels_by_name(name).into_iter().next(),
    }
}

/// Resolves a guild member, or the author in a direct message.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAdapter;

impl TypeAdapter for UserAdapter {
    type Output = User;

    fn parse(&self, raw: &str, ctx: &InvocationContext) -> Option<User> {
        if ctx.source().is_from_guild() {
            return resolve_member(raw, ctx).map(|m| m.user);
        }
        let author = ctx.source().author();
        let matches = match lookup(raw) {
            Lookup::Id(id) => author.id == id,
            Lookup::Name(name) => author.name.eq_ignore_ascii_case(name),
        };
        matches.then(|| author.clone())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemberAdapter;

impl TypeAdapter for MemberAdapter {
    type Output = Member;

    fn parse(&self, raw: &str, ctx: &InvocationContext) -> Option<Member> {
        resolve_member(raw, ctx)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAdapter;

impl TypeAdapter for RoleAdapter {
    type Output = Role;

    fn parse(&self, raw: &str, ctx: &InvocationContext) -> Option<Role> {
        resolve_role(raw, ctx)
    }
}

/// Any channel of the guild.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelAdapter;

impl TypeAdapter for ChannelAdapter {
    type Output = Channel;

    fn parse(&self, raw: &str, ctx: &InvocationContext) -> Option<Channel> {
        resolve_channel(raw, ctx)
    }
}

/// A channel wrapper that only accepts some channel kinds.
pub trait ChannelKind: Send + Sync + Sized + 'static {
    fn wrap(channel: Channel) -> Option<Self>;
}

macro_rules! channel_kind {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ChannelKind for $ty {
                fn wrap(channel: Channel) -> Option<Self> {
                    <$ty>::from_channel(channel)
                }
            }
        )*
    };
}

channel_kind!(
    TextChannel,
    NewsChannel,
    VoiceChannel,
    StageChannel,
    AudioChannel,
    ThreadChannel,
);

/// Resolves a channel and rejects it unless its kind fits `K`.
#[derive(Debug)]
pub struct ChannelKindAdapter<K>(PhantomData<fn() -> K>);

impl<K> ChannelKindAdapter<K> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K> Default for ChannelKindAdapter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ChannelKind> TypeAdapter for ChannelKindAdapter<K> {
    type Output = K;

    fn parse(&self, raw: &str, ctx: &InvocationContext) -> Option<K> {
        resolve_channel(raw, ctx).and_then(K::wrap)
    }
}
