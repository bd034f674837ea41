//! Inbound events.
//!
//! The platform delivers two shapes of input: free-text messages and
//! structured interactions that already carry a command name and typed
//! options. Both share an [`EventSource`] describing who sent the event,
//! where, and how to answer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{BoxedGuild, Channel, ChannelType, Member, User};
use crate::reply::BoxedReplyCallback;

/// Origin of an inbound event.
#[derive(Clone)]
pub struct EventSource {
    author: User,
    member: Option<Member>,
    channel: Channel,
    guild: Option<BoxedGuild>,
    reply: BoxedReplyCallback,
}

impl EventSource {
    /// Creates a source outside any guild (a direct message).
    pub fn new(author: User, channel: Channel, reply: BoxedReplyCallback) -> Self {
        Self {
            author,
            member: None,
            channel,
            guild: None,
            reply,
        }
    }

    /// Places the source inside `guild`, with the author's membership.
    pub fn in_guild(mut self, guild: BoxedGuild, member: Member) -> Self {
        self.guild = Some(guild);
        self.member = Some(member);
        self
    }

    pub fn author(&self) -> &User {
        &self.author
    }

    pub fn member(&self) -> Option<&Member> {
        self.member.as_ref()
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn guild(&self) -> Option<&BoxedGuild> {
        self.guild.as_ref()
    }

    pub fn reply(&self) -> &BoxedReplyCallback {
        &self.reply
    }

    pub fn is_from_guild(&self) -> bool {
        self.guild.is_some()
    }

    pub fn is_from_type(&self, kind: ChannelType) -> bool {
        self.channel.kind == kind
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("author", &self.author.id)
            .field("channel", &self.channel.id)
            .field("guild", &self.guild.as_ref().map(|g| g.id()))
            .finish()
    }
}

/// A free-text message.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub content: String,
    pub source: EventSource,
}

impl MessageEvent {
    pub fn new(content: impl Into<String>, source: EventSource) -> Self {
        Self {
            content: content.into(),
            source,
        }
    }
}

/// Typed value of a structured option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionData {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(u64),
    Role(u64),
    Channel(u64),
}

impl OptionData {
    /// The textual form handed to type adapters. Entity options render as
    /// their id.
    pub fn to_raw(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::User(id) | Self::Role(id) | Self::Channel(id) => id.to_string(),
        }
    }
}

/// A named option of a structured interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionValue {
    pub name: String,
    pub data: OptionData,
}

impl OptionValue {
    pub fn new(name: impl Into<String>, data: OptionData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A structured interaction. `name` may carry a sub-command path separated
/// by spaces (`"config set"`).
#[derive(Debug, Clone)]
pub struct InteractionEvent {
    pub name: String,
    pub options: Vec<OptionValue>,
    pub source: EventSource,
}

impl InteractionEvent {
    pub fn new(name: impl Into<String>, source: EventSource) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
            source,
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, data: OptionData) -> Self {
        self.options.push(OptionValue::new(name, data));
        self
    }
}

/// Either kind of inbound event.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(MessageEvent),
    Interaction(InteractionEvent),
}

impl InboundEvent {
    pub fn source(&self) -> &EventSource {
        match self {
            Self::Message(m) => &m.source,
            Self::Interaction(i) => &i.source,
        }
    }
}

impl From<MessageEvent> for InboundEvent {
    fn from(event: MessageEvent) -> Self {
        Self::Message(event)
    }
}

impl From<InteractionEvent> for InboundEvent {
    fn from(event: InteractionEvent) -> Self {
        Self::Interaction(event)
    }
}
