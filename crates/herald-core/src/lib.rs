//! Platform model for the Herald command framework.
//!
//! This crate holds the types every other Herald crate agrees on: the
//! entities a command can refer to, the inbound events the platform
//! delivers, and the payloads and callbacks used to reply.
//!
//! It deliberately knows nothing about commands. Routing, argument binding
//! and dispatch live in `herald-framework`.

pub mod entity;
pub mod event;
pub mod message;
pub mod reply;

pub use entity::{
    AudioChannel, BoxedGuild, Channel, ChannelType, Guild, Member, MemoryGuild, NewsChannel, Role,
    StageChannel, TextChannel, ThreadChannel, User, VoiceChannel, sanitize_mention,
};
pub use event::{
    EventSource, InboundEvent, InteractionEvent, MessageEvent, OptionData, OptionValue,
};
pub use message::{PayloadField, ReplyKind, ReplyPayload};
pub use reply::{BoxedReplyCallback, BufferedReply, NoopReply, ReplyCallback, SentReply};
