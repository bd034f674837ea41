//! Per-invocation state.
//!
//! An [`InvocationContext`] is created by a parser for every event that
//! looks like a command, then passed mutably through each pipeline phase:
//! filters, router, binder and finally the handler call. It is discarded
//! once dispatch returns.
//!
//! Cancellation is one-way. The first [`cancel`](InvocationContext::cancel)
//! records the reply the user will see; later calls are ignored, and no
//! further arguments can be bound.

use std::sync::Arc;

use herald_core::{EventSource, OptionValue, ReplyPayload};

use crate::catalog::CommandDefinition;
use crate::handler::Argument;
use crate::settings::GuildSettings;

/// How the command was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A free-text message split into tokens.
    Text,
    /// A structured interaction with named options.
    Structured,
}

/// State of one command invocation.
#[derive(Debug)]
pub struct InvocationContext {
    kind: InputKind,
    input: Vec<String>,
    options: Vec<OptionValue>,
    option_slots: Vec<Option<String>>,
    source: EventSource,
    settings: GuildSettings,
    command: Option<Arc<CommandDefinition>>,
    possible_commands: Vec<Arc<CommandDefinition>>,
    arguments: Vec<Argument>,
    error_message: Option<ReplyPayload>,
    cancelled: bool,
    help_event: bool,
    migrating: bool,
}

impl InvocationContext {
    fn new(
        kind: InputKind,
        input: Vec<String>,
        options: Vec<OptionValue>,
        source: EventSource,
        settings: GuildSettings,
    ) -> Self {
        Self {
            kind,
            input,
            options,
            option_slots: Vec::new(),
            source,
            settings,
            command: None,
            possible_commands: Vec::new(),
            arguments: Vec::new(),
            error_message: None,
            cancelled: false,
            help_event: false,
            migrating: false,
        }
    }

    /// A free-text invocation. `input` is the tokenized message with the
    /// prefix already removed.
    pub fn text(source: EventSource, settings: GuildSettings, input: Vec<String>) -> Self {
        Self::new(InputKind::Text, input, Vec::new(), source, settings)
    }

    /// A structured invocation. The command path in `name` becomes the
    /// initial input so the router can walk it.
    pub fn structured(
        source: EventSource,
        settings: GuildSettings,
        name: &str,
        options: Vec<OptionValue>,
    ) -> Self {
        let input = name.split_whitespace().map(str::to_string).collect();
        Self::new(InputKind::Structured, input, options, source, settings)
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn is_structured(&self) -> bool {
        self.kind == InputKind::Structured
    }

    /// Remaining raw tokens.
    pub fn input(&self) -> &[String] {
        &self.input
    }

    /// Replaces the raw tokens. Filters running before adapting may use
    /// this to rewrite input; for a structured invocation the new tokens
    /// are matched back onto the supplied options in order.
    pub fn set_input(&mut self, input: Vec<String>) {
        self.input = input;
    }

    /// Structured options; empty for text invocations.
    pub fn options(&self) -> &[OptionValue] {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn source(&self) -> &EventSource {
        &self.source
    }

    pub fn settings(&self) -> &GuildSettings {
        &self.settings
    }

    /// The prefix users type in this context: `/` for structured input,
    /// otherwise the configured prefix.
    pub fn contextual_prefix(&self) -> &str {
        match self.kind {
            InputKind::Structured => "/",
            InputKind::Text => &self.settings.prefix,
        }
    }

    pub fn command(&self) -> Option<&Arc<CommandDefinition>> {
        self.command.as_ref()
    }

    pub(crate) fn set_command(&mut self, command: Arc<CommandDefinition>) {
        self.command = Some(command);
    }

    /// Candidates from an ambiguous lookup.
    pub fn possible_commands(&self) -> &[Arc<CommandDefinition>] {
        &self.possible_commands
    }

    pub(crate) fn set_possible_commands(&mut self, commands: Vec<Arc<CommandDefinition>>) {
        self.possible_commands = commands;
    }

    /// Bound arguments, the command event first.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Appends a bound argument. Ignored once the invocation is cancelled.
    pub(crate) fn push_argument(&mut self, argument: Argument) {
        if !self.cancelled {
            self.arguments.push(argument);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn error_message(&self) -> Option<&ReplyPayload> {
        self.error_message.as_ref()
    }

    /// Cancels the invocation with the reply the user should see.
    ///
    /// Returns `false` if it was already cancelled; the first reply wins.
    pub fn cancel(&mut self, message: ReplyPayload) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        self.error_message = Some(message);
        true
    }

    pub fn is_help_event(&self) -> bool {
        self.help_event
    }

    pub fn set_help_event(&mut self, help: bool) {
        self.help_event = help;
    }

    /// Set for free-text input that should carry a migration notice.
    pub fn is_migrating(&self) -> bool {
        self.migrating
    }

    pub fn set_migrating(&mut self, migrating: bool) {
        self.migrating = migrating;
    }

    /// One slot per parameter of the matched command, holding the raw
    /// value of the option with that name. Empty until options are
    /// projected.
    pub fn option_slots(&self) -> &[Option<String>] {
        &self.option_slots
    }

    /// Replaces the raw input of a structured invocation with the values
    /// of the options the matched command declares, in declaration order.
    /// Undeclared or missing options contribute nothing.
    pub(crate) fn project_options(&mut self) {
        let Some(command) = &self.command else {
            return;
        };
        self.option_slots = command
            .parameters()
            .iter()
            .map(|p| {
                self.options
                    .iter()
                    .find(|o| o.name == p.name())
                    .map(|o| o.data.to_raw())
            })
            .collect();
        self.input = self.option_slots.iter().flatten().cloned().collect();
    }

    /// The option slots with the current input written back into the
    /// supplied ones. A slot left without a token becomes empty.
    pub(crate) fn rewritten_slots(&self) -> Vec<Option<String>> {
        let mut tokens = self.input.iter();
        self.option_slots
            .iter()
            .map(|slot| slot.as_ref().and_then(|_| tokens.next().cloned()))
            .collect()
    }
}
