//! Platform entities referenced by commands.
//!
//! These are plain data snapshots of what the chat platform knows about a
//! user, a guild member, a role or a channel. Lookups that require the
//! platform (resolving a name to a member, for instance) go through the
//! [`Guild`] trait so that adapters can be backed by a live cache or by
//! the in-memory [`MemoryGuild`].

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A platform-wide user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }

    /// Marks this account as an automated (bot) account.
    pub fn bot(mut self) -> Self {
        self.bot = true;
        self
    }

    /// Returns the mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A named role inside a guild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
}

impl Role {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A user's membership in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Member {
    pub fn new(user: User) -> Self {
        Self {
            user,
            nickname: None,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn id(&self) -> u64 {
        self.user.id
    }

    /// The nickname if one is set, otherwise the account name.
    pub fn effective_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.name)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r.id == role.id)
    }

    /// Permission tags are compared case-insensitively.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.eq_ignore_ascii_case(permission))
    }
}

/// The kind of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Text,
    News,
    Voice,
    Stage,
    Thread,
    Private,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::News => "news",
            Self::Voice => "voice",
            Self::Stage => "stage",
            Self::Thread => "thread",
            Self::Private => "private",
        };
        f.write_str(name)
    }
}

/// A channel messages are posted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    pub name: String,
    pub kind: ChannelType,
}

impl Channel {
    pub fn new(id: u64, name: impl Into<String>, kind: ChannelType) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    /// A direct-message channel with no name.
    pub fn private(id: u64) -> Self {
        Self::new(id, "", ChannelType::Private)
    }
}

// ─── Channel kind wrappers ───────────────────────────────────────────────────

macro_rules! channel_kind {
    ($(#[$meta:meta])* $name:ident => [$($kind:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub Channel);

        impl $name {
            /// Channel kinds this wrapper accepts.
            pub const KINDS: &'static [ChannelType] = &[$(ChannelType::$kind),+];

            /// Wraps `channel` if its kind is accepted.
            pub fn from_channel(channel: Channel) -> Option<Self> {
                Self::KINDS.contains(&channel.kind).then_some(Self(channel))
            }

            pub fn into_inner(self) -> Channel {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Channel;

            fn deref(&self) -> &Channel {
                &self.0
            }
        }
    };
}

channel_kind!(
    /// A plain text channel.
    TextChannel => [Text]
);
channel_kind!(
    /// An announcement channel.
    NewsChannel => [News]
);
channel_kind!(
    /// A voice channel.
    VoiceChannel => [Voice]
);
channel_kind!(
    /// A stage channel.
    StageChannel => [Stage]
);
channel_kind!(
    /// Any channel that carries audio.
    AudioChannel => [Voice, Stage]
);
channel_kind!(
    /// A thread spawned from another channel.
    ThreadChannel => [Thread]
);

// ─── Guild ───────────────────────────────────────────────────────────────────

/// Read access to a guild's members, roles and channels.
///
/// Name lookups are case-insensitive and return every match in the
/// platform's natural order; callers that need a single entity take the
/// first one.
pub trait Guild: Send + Sync {
    fn id(&self) -> u64;

    fn name(&self) -> &str;

    fn member_by_id(&self, id: u64) -> Option<Member>;

    /// Matches against the member's effective name.
    fn members_by_name(&self, name: &str) -> Vec<Member>;

    fn role_by_id(&self, id: u64) -> Option<Role>;

    fn roles_by_name(&self, name: &str) -> Vec<Role>;

    fn channel_by_id(&self, id: u64) -> Option<Channel>;

    fn channels_by_name(&self, name: &str) -> Vec<Channel>;
}

/// Shared handle to a guild.
pub type BoxedGuild = Arc<dyn Guild>;

/// A guild held entirely in memory.
///
/// Useful for tests and for platforms that push full guild snapshots.
#[derive(Debug, Clone, Default)]
pub struct MemoryGuild {
    id: u64,
    name: String,
    members: Vec<Member>,
    roles: Vec<Role>,
    channels: Vec<Channel>,
}

impl MemoryGuild {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn into_boxed(self) -> BoxedGuild {
        Arc::new(self)
    }
}

impl Guild for MemoryGuild {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn member_by_id(&self, id: u64) -> Option<Member> {
        self.members.iter().find(|m| m.id() == id).cloned()
    }

    fn members_by_name(&self, name: &str) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| m.effective_name().eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }

    fn role_by_id(&self, id: u64) -> Option<Role> {
        self.roles.iter().find(|r| r.id == id).cloned()
    }

    fn roles_by_name(&self, name: &str) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|r| r.name.eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }

    fn channel_by_id(&self, id: u64) -> Option<Channel> {
        self.channels.iter().find(|c| c.id == id).cloned()
    }

    fn channels_by_name(&self, name: &str) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name))
            .cloned()
            .collect()
    }
}

/// Strips mention markup (`<@id>`, `<@!id>`, `<@&id>`, `<#id>`) from a raw
/// token, leaving the inner id. Tokens that are not mentions are returned
/// unchanged.
pub fn sanitize_mention(raw: &str) -> &str {
    let Some(inner) = raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) else {
        return raw;
    };
    ["@!", "@&", "@", "#"]
        .iter()
        .find_map(|prefix| inner.strip_prefix(prefix))
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> MemoryGuild {
        MemoryGuild::new(1, "test")
            .with_member(Member::new(User::new(10, "alice")).with_nickname("Ally"))
            .with_member(Member::new(User::new(11, "bob")))
            .with_role(Role::new(20, "Moderator"))
            .with_channel(Channel::new(30, "general", ChannelType::Text))
            .with_channel(Channel::new(31, "lounge", ChannelType::Voice))
    }

    #[test]
    fn test_sanitize_mention() {
        assert_eq!(sanitize_mention("<@123>"), "123");
        assert_eq!(sanitize_mention("<@!123>"), "123");
        assert_eq!(sanitize_mention("<@&42>"), "42");
        assert_eq!(sanitize_mention("<#7>"), "7");
        assert_eq!(sanitize_mention("plain"), "plain");
        assert_eq!(sanitize_mention("<weird>"), "<weird>");
    }

    #[test]
    fn test_member_lookup_by_effective_name() {
        let guild = guild();
        assert_eq!(guild.members_by_name("ally")[0].id(), 10);
        assert!(guild.members_by_name("alice").is_empty());
        assert_eq!(guild.members_by_name("BOB")[0].id(), 11);
    }

    #[test]
    fn test_channel_kind_wrappers() {
        let guild = guild();
        let text = guild.channel_by_id(30).unwrap();
        let voice = guild.channel_by_id(31).unwrap();

        assert!(TextChannel::from_channel(text.clone()).is_some());
        assert!(VoiceChannel::from_channel(text).is_none());
        assert_eq!(AudioChannel::from_channel(voice).unwrap().name, "lounge");
    }

    #[test]
    fn test_member_permissions_ignore_case() {
        let member = Member::new(User::new(1, "a")).with_permission("BAN_MEMBERS");
        assert!(member.has_permission("ban_members"));
        assert!(!member.has_permission("kick_members"));
    }
}
