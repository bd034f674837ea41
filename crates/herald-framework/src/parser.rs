//! Turning inbound events into invocation contexts.
//!
//! A [`Parser`] decides whether an event is addressed to the bot and, if
//! so, builds the [`InvocationContext`] the dispatcher runs. The
//! [`ParserSupervisor`] picks the parser for each event according to the
//! configured [`RoutingPolicy`].

use std::sync::Arc;

use herald_core::{InboundEvent, InteractionEvent, MessageEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::context::InvocationContext;
use crate::settings::{BoxedSettingsProvider, GuildSettings};

/// Which event shapes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Free-text messages only.
    #[default]
    Text,
    /// Structured interactions only.
    Structured,
    /// Both shapes.
    TextAndStructured,
    /// Both shapes; text invocations also receive a deprecation notice.
    Migrating,
}

impl RoutingPolicy {
    pub fn accepts_text(self) -> bool {
        !matches!(self, Self::Structured)
    }

    pub fn accepts_structured(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Builds a context from one kind of event.
pub trait Parser<E>: Send + Sync {
    /// `None` if the event is not a command invocation.
    fn parse(&self, event: E) -> Option<InvocationContext>;
}

impl<E, F> Parser<E> for F
where
    F: Fn(E) -> Option<InvocationContext> + Send + Sync,
{
    fn parse(&self, event: E) -> Option<InvocationContext> {
        self(event)
    }
}

// ============================================================================
// Free text
// ============================================================================

/// Parses prefixed (or bot-mentioning) free-text messages.
///
/// The content after the prefix is split on whitespace. A leading help
/// label marks the invocation as a help request and is removed.
#[derive(Clone)]
pub struct MessageParser {
    settings: BoxedSettingsProvider,
    self_id: Option<u64>,
}

impl MessageParser {
    pub fn new(settings: BoxedSettingsProvider) -> Self {
        Self {
            settings,
            self_id: None,
        }
    }

    /// The bot's own user id. Required for mentions to work as a prefix.
    pub fn self_id(mut self, id: u64) -> Self {
        self.self_id = Some(id);
        self
    }

    fn strip_prefix<'a>(&self, content: &'a str, settings: &GuildSettings) -> Option<&'a str> {
        if let Some(id) = self.self_id.filter(|_| settings.parse_mentions) {
            for mention in [format!("<@{id}>"), format!("<@!{id}>")] {
                if let Some(rest) = content.strip_prefix(mention.as_str()) {
                    return Some(rest);
                }
            }
        }

        let prefix = settings.prefix.as_str();
        if prefix.is_empty() {
            return Some(content);
        }
        if settings.ignore_case {
            let head = content.get(..prefix.len())?;
            head.eq_ignore_ascii_case(prefix)
                .then(|| &content[prefix.len()..])
        } else {
            content.strip_prefix(prefix)
        }
    }
}

impl Parser<MessageEvent> for MessageParser {
    fn parse(&self, event: MessageEvent) -> Option<InvocationContext> {
        let MessageEvent { content, source } = event;
        let settings = self.settings.settings(source.guild().map(|g| g.as_ref()));

        if settings.ignore_bots && source.author().bot {
            trace!(author = source.author().id, "Ignoring bot message");
            return None;
        }

        let rest = self.strip_prefix(content.trim_start(), &settings)?;
        let mut tokens: Vec<String> = rest.split_whitespace().map(str::to_string).collect();

        let help = tokens.first().is_some_and(|t| settings.is_help_label(t));
        if help {
            tokens.remove(0);
        }

        debug!(tokens = tokens.len(), help, "Parsed message");
        let mut ctx = InvocationContext::text(source, settings, tokens);
        ctx.set_help_event(help);
        Some(ctx)
    }
}

/// A [`MessageParser`] whose invocations carry the migration notice.
#[derive(Clone)]
pub struct MigratingMessageParser {
    inner: MessageParser,
}

impl MigratingMessageParser {
    pub fn new(inner: MessageParser) -> Self {
        Self { inner }
    }
}

impl Parser<MessageEvent> for MigratingMessageParser {
    fn parse(&self, event: MessageEvent) -> Option<InvocationContext> {
        let mut ctx = self.inner.parse(event)?;
        ctx.set_migrating(true);
        Some(ctx)
    }
}

// ============================================================================
// Structured
// ============================================================================

/// Parses structured interactions. Every interaction is an invocation; an
/// interaction named after a help label is a help request for the rest of
/// its path.
#[derive(Clone)]
pub struct InteractionParser {
    settings: BoxedSettingsProvider,
}

impl InteractionParser {
    pub fn new(settings: BoxedSettingsProvider) -> Self {
        Self { settings }
    }
}

impl Parser<InteractionEvent> for InteractionParser {
    fn parse(&self, event: InteractionEvent) -> Option<InvocationContext> {
        let InteractionEvent {
            name,
            options,
            source,
        } = event;
        let settings = self.settings.settings(source.guild().map(|g| g.as_ref()));

        let mut ctx = InvocationContext::structured(source, settings, &name, options);
        let help = ctx
            .input()
            .first()
            .is_some_and(|t| ctx.settings().is_help_label(t));
        if help {
            let rest = ctx.input()[1..].to_vec();
            ctx.set_input(rest);
            ctx.set_help_event(true);
        }

        debug!(name = %name, options = ctx.options().len(), help, "Parsed interaction");
        Some(ctx)
    }
}

// ============================================================================
// Supervisor
// ============================================================================

type BoxedParser<E> = Arc<dyn Parser<E>>;

/// Routes inbound events to the parser registered for their shape.
///
/// The initial parsers follow the [`RoutingPolicy`]; either slot can be
/// replaced or cleared afterwards.
#[derive(Clone)]
pub struct ParserSupervisor {
    policy: RoutingPolicy,
    message: Option<BoxedParser<MessageEvent>>,
    interaction: Option<BoxedParser<InteractionEvent>>,
}

impl ParserSupervisor {
    pub fn new(policy: RoutingPolicy, settings: BoxedSettingsProvider, self_id: Option<u64>) -> Self {
        let mut text = MessageParser::new(settings.clone());
        if let Some(id) = self_id {
            text = text.self_id(id);
        }

        let message: Option<BoxedParser<MessageEvent>> = match policy {
            RoutingPolicy::Structured => None,
            RoutingPolicy::Migrating => Some(Arc::new(MigratingMessageParser::new(text))),
            RoutingPolicy::Text | RoutingPolicy::TextAndStructured => Some(Arc::new(text)),
        };
        let interaction: Option<BoxedParser<InteractionEvent>> = policy
            .accepts_structured()
            .then(|| Arc::new(InteractionParser::new(settings)) as BoxedParser<InteractionEvent>);

        debug!(?policy, "Parser supervisor created");
        Self {
            policy,
            message,
            interaction,
        }
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    /// Replaces (or with `None`, removes) the free-text parser.
    pub fn set_message_parser(&mut self, parser: Option<impl Parser<MessageEvent> + 'static>) {
        self.message = parser.map(|p| Arc::new(p) as BoxedParser<MessageEvent>);
        debug!(registered = self.message.is_some(), "Message parser updated");
    }

    /// Replaces (or with `None`, removes) the structured parser.
    pub fn set_interaction_parser(
        &mut self,
        parser: Option<impl Parser<InteractionEvent> + 'static>,
    ) {
        self.interaction = parser.map(|p| Arc::new(p) as BoxedParser<InteractionEvent>);
        debug!(
            registered = self.interaction.is_some(),
            "Interaction parser updated"
        );
    }

    /// `None` if no parser handles the event's shape or the parser
    /// rejected it.
    pub fn parse(&self, event: InboundEvent) -> Option<InvocationContext> {
        match event {
            InboundEvent::Message(message) => {
                let Some(parser) = &self.message else {
                    trace!("No parser for messages");
                    return None;
                };
                parser.parse(message)
            }
            InboundEvent::Interaction(interaction) => {
                let Some(parser) = &self.interaction else {
                    trace!("No parser for interactions");
                    return None;
                };
                parser.parse(interaction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use herald_core::{BufferedReply, Channel, EventSource, OptionData, User};

    use super::*;
    use crate::settings::StaticSettingsProvider;
    use crate::testing::{GUILD_ID, MODERATOR, guild_source};

    const BOT_ID: u64 = 999;

    fn provider(settings: GuildSettings) -> BoxedSettingsProvider {
        Arc::new(StaticSettingsProvider::new(settings))
    }

    fn message(content: &str) -> MessageEvent {
        MessageEvent::new(content, guild_source(MODERATOR, BufferedReply::new()))
    }

    fn parse(content: &str) -> Option<InvocationContext> {
        MessageParser::new(provider(GuildSettings::default()))
            .self_id(BOT_ID)
            .parse(message(content))
    }

    #[test]
    fn test_prefix_is_required() {
        assert!(parse("ping").is_none());
        let ctx = parse("!ping  a b").unwrap();
        assert_eq!(ctx.input(), ["ping", "a", "b"]);
        assert!(!ctx.is_structured());
        assert!(!ctx.is_help_event());
    }

    #[test]
    fn test_mention_replaces_prefix() {
        assert_eq!(parse("<@999> ping").unwrap().input(), ["ping"]);
        assert_eq!(parse("<@!999> ping").unwrap().input(), ["ping"]);
        assert!(parse("<@123> ping").is_none());

        let settings = GuildSettings {
            parse_mentions: false,
            ..Default::default()
        };
        let parser = MessageParser::new(provider(settings)).self_id(BOT_ID);
        assert!(parser.parse(message("<@999> ping")).is_none());
    }

    #[test]
    fn test_help_label() {
        let ctx = parse("!help ban").unwrap();
        assert!(ctx.is_help_event());
        assert_eq!(ctx.input(), ["ban"]);

        let ctx = parse("!help").unwrap();
        assert!(ctx.is_help_event());
        assert!(ctx.input().is_empty());

        assert!(!parse("!HELP").unwrap().is_help_event());
    }

    #[test]
    fn test_ignore_case_prefix() {
        let settings = GuildSettings {
            prefix: "hb!".to_string(),
            ignore_case: true,
            ..Default::default()
        };
        let parser = MessageParser::new(provider(settings));
        let ctx = parser.parse(message("HB!Help ping")).unwrap();
        assert!(ctx.is_help_event());
        assert_eq!(ctx.input(), ["ping"]);
    }

    #[test]
    fn test_bots_are_ignored() {
        let bot = User {
            bot: true,
            ..User::new(5, "other-bot")
        };
        let source = EventSource::new(bot, Channel::private(900), BufferedReply::new());
        let event = MessageEvent::new("!ping", source);

        let parser = MessageParser::new(provider(GuildSettings::default()));
        assert!(parser.parse(event.clone()).is_none());

        let settings = GuildSettings {
            ignore_bots: false,
            ..Default::default()
        };
        assert!(MessageParser::new(provider(settings)).parse(event).is_some());
    }

    #[test]
    fn test_guild_settings_are_applied() {
        let settings = StaticSettingsProvider::new(GuildSettings::default());
        settings.set_guild(
            GUILD_ID,
            GuildSettings {
                prefix: "?".to_string(),
                ..Default::default()
            },
        );
        let parser = MessageParser::new(Arc::new(settings));
        assert!(parser.parse(message("!ping")).is_none());
        assert_eq!(parser.parse(message("?ping")).unwrap().settings().prefix, "?");
    }

    #[test]
    fn test_interaction() {
        let parser = InteractionParser::new(provider(GuildSettings::default()));
        let event = InteractionEvent::new("config set", guild_source(MODERATOR, BufferedReply::new()))
            .with_option("key", OptionData::String("volume".into()));

        let ctx = parser.parse(event).unwrap();
        assert!(ctx.is_structured());
        assert_eq!(ctx.input(), ["config", "set"]);
        assert_eq!(ctx.options().len(), 1);
        assert_eq!(ctx.contextual_prefix(), "/");
    }

    #[test]
    fn test_supervisor_follows_policy() {
        let settings = provider(GuildSettings::default());
        let text = || InboundEvent::from(message("!ping"));
        let structured = || {
            InboundEvent::from(InteractionEvent::new(
                "ping",
                guild_source(MODERATOR, BufferedReply::new()),
            ))
        };

        let only_text = ParserSupervisor::new(RoutingPolicy::Text, settings.clone(), None);
        assert!(only_text.parse(text()).is_some());
        assert!(only_text.parse(structured()).is_none());

        let only_structured =
            ParserSupervisor::new(RoutingPolicy::Structured, settings.clone(), None);
        assert!(only_structured.parse(text()).is_none());
        assert!(only_structured.parse(structured()).is_some());

        let migrating = ParserSupervisor::new(RoutingPolicy::Migrating, settings, None);
        assert!(migrating.parse(text()).unwrap().is_migrating());
        assert!(!migrating.parse(structured()).unwrap().is_migrating());
    }

    #[test]
    fn test_supervisor_parser_replacement() {
        let mut supervisor = ParserSupervisor::new(
            RoutingPolicy::TextAndStructured,
            provider(GuildSettings::default()),
            None,
        );
        supervisor.set_message_parser(Some(|event: MessageEvent| {
            let tokens = vec![event.content.to_uppercase()];
            Some(InvocationContext::text(
                event.source,
                GuildSettings::default(),
                tokens,
            ))
        }));
        let ctx = supervisor.parse(message("ping").into()).unwrap();
        assert_eq!(ctx.input(), ["PING"]);

        supervisor.set_interaction_parser(None::<InteractionParser>);
        let event = InteractionEvent::new("ping", guild_source(MODERATOR, BufferedReply::new()));
        assert!(supervisor.parse(event.into()).is_none());
    }

    #[test]
    fn test_policy_serde() {
        let policy: RoutingPolicy = serde_json::from_str("\"text_and_structured\"").unwrap();
        assert_eq!(policy, RoutingPolicy::TextAndStructured);
        assert!(policy.accepts_text() && policy.accepts_structured());
    }
}
