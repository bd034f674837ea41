//! Ping Bot Example
//!
//! Drives the Herald runtime with a handful of simulated messages and
//! interactions instead of a live platform connection. Replies are written
//! to the log.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package ping-bot
//! HERALD_DISPATCH__PREFIX=? cargo run --package ping-bot
//! ```

use std::time::Duration;

use anyhow::Result;
use herald::prelude::*;
use tracing::info;

// ============================================================================
// Handlers
// ============================================================================

async fn ping(_event: CommandEvent) -> &'static str {
    "pong"
}

async fn echo(_event: CommandEvent, text: String) -> String {
    text
}

async fn roll(event: CommandEvent, sides: i64) -> ReplyPayload {
    // Not random, but stable enough to check by eye.
    let value = (event.author().id as i64 % sides) + 1;
    ReplyPayload::text(format!("You rolled {value}")).with_title(format!("d{sides}"))
}

async fn whois(_event: CommandEvent, member: Member) -> ReplyPayload {
    ReplyPayload::text(member.effective_name().to_string())
        .field("id", member.id().to_string())
        .field("roles", member.roles.len().to_string())
}

async fn slow(_event: CommandEvent) -> &'static str {
    tokio::time::sleep(Duration::from_millis(200)).await;
    "done"
}

// ============================================================================
// Simulated platform
// ============================================================================

/// Logs replies instead of sending them.
struct LogReply {
    channel: String,
}

impl ReplyCallback for LogReply {
    fn reply(&self, payload: ReplyPayload, ephemeral: bool) {
        info!(
            channel = %self.channel,
            ephemeral,
            title = payload.title.as_deref().unwrap_or(""),
            "{}",
            payload.description
        );
    }

    fn acknowledge(&self, ephemeral: bool) {
        info!(channel = %self.channel, ephemeral, "Interaction acknowledged");
    }
}

fn guild() -> MemoryGuild {
    let moderator = Role::new(10, "Moderator");
    MemoryGuild::new(1, "Herald Lounge")
        .with_member(Member::new(User::new(100, "alice")).with_role(moderator.clone()))
        .with_member(Member::new(User::new(101, "bob")).with_nickname("Bobby"))
        .with_role(moderator)
        .with_channel(Channel::new(20, "general", ChannelType::Text))
}

fn source(author_id: u64) -> EventSource {
    let guild = guild();
    let member = guild
        .member_by_id(author_id)
        .unwrap_or_else(|| Member::new(User::new(author_id, "guest")));
    let channel = Channel::new(20, "general", ChannelType::Text);
    let reply = std::sync::Arc::new(LogReply {
        channel: channel.name.clone(),
    });
    EventSource::new(member.user.clone(), channel, reply).in_guild(guild.into_boxed(), member)
}

#[tokio::main]
async fn main() -> Result<()> {
    let lifecycle = DispatcherLifecycle::new();
    let runtime = HeraldRuntime::builder()
        .merge(HeraldConfig {
            dispatch: herald::runtime::config::DispatchConfig {
                policy: RoutingPolicy::TextAndStructured,
                ..Default::default()
            },
            ..Default::default()
        })
        .command(
            CommandDefinition::builder("ping")
                .description("Checks that the bot is alive")
                .handler(ping),
        )
        .command(
            CommandDefinition::builder("echo")
                .alias("say")
                .param(ParameterDefinition::of::<String>("text").concat())
                .handler(echo),
        )
        .command(
            CommandDefinition::builder("roll")
                .param(
                    ParameterDefinition::of::<i64>("sides")
                        .default_value("6")
                        .constraint("min", 2)
                        .constraint_with_message("max", 100, "That die is too big"),
                )
                .handler(roll),
        )
        .command(
            CommandDefinition::builder("whois")
                .category("Moderation")
                .param(ParameterDefinition::of::<Member>("member"))
                .handler(whois),
        )
        .command(CommandDefinition::builder("slow").handler(slow))
        .build(&lifecycle)?;

    let messages = [
        (100, "!ping"),
        (101, "!say hello there"),
        (100, "!roll"),
        (101, "!roll 1000"),
        (100, "!whois Bobby"),
        (100, "!whois nobody"),
        (101, "!pong"),
        (100, "!help roll"),
        (100, "!slow"),
        (101, "just chatting"),
    ];
    for (author, content) in messages {
        runtime.handle_message(MessageEvent::new(content, source(author)));
    }

    runtime.handle_interaction(
        InteractionEvent::new("roll", source(101)).with_option("sides", OptionData::Integer(20)),
    );

    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await?;

    info!(stats = %runtime.stats(), "Simulation finished");
    Ok(())
}
