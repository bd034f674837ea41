//! Per-guild dispatch settings.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use herald_core::Guild;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Settings that shape how messages in one guild are parsed and routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    /// Prefix that marks a message as a command.
    pub prefix: String,
    /// Match labels regardless of case.
    pub ignore_case: bool,
    /// Drop messages written by bot accounts.
    pub ignore_bots: bool,
    /// Accept a mention of the bot in place of the prefix.
    pub parse_mentions: bool,
    /// Labels that turn a message into a help request.
    pub help_labels: Vec<String>,
    /// The whole guild is muted.
    pub muted: bool,
    /// Channels in which commands are rejected.
    pub muted_channels: HashSet<u64>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            ignore_case: false,
            ignore_bots: true,
            parse_mentions: true,
            help_labels: vec!["help".to_string()],
            muted: false,
            muted_channels: HashSet::new(),
        }
    }
}

impl GuildSettings {
    /// The first help label, used when telling users how to get help.
    pub fn help_label(&self) -> &str {
        self.help_labels.first().map(String::as_str).unwrap_or("help")
    }

    pub fn is_help_label(&self, label: &str) -> bool {
        self.help_labels.iter().any(|l| {
            if self.ignore_case {
                l.eq_ignore_ascii_case(label)
            } else {
                l == label
            }
        })
    }
}

/// Supplies the settings for the guild an event came from.
pub trait SettingsProvider: Send + Sync {
    /// `guild` is `None` for direct messages.
    fn settings(&self, guild: Option<&dyn Guild>) -> GuildSettings;
}

/// Shared handle to a settings provider.
pub type BoxedSettingsProvider = Arc<dyn SettingsProvider>;

/// Default settings with optional per-guild overrides, editable at runtime.
#[derive(Debug, Default)]
pub struct StaticSettingsProvider {
    defaults: GuildSettings,
    overrides: RwLock<HashMap<u64, GuildSettings>>,
}

impl StaticSettingsProvider {
    pub fn new(defaults: GuildSettings) -> Self {
        Self {
            defaults,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    pub fn defaults(&self) -> &GuildSettings {
        &self.defaults
    }

    /// Replaces the settings of one guild.
    pub fn set_guild(&self, guild_id: u64, settings: GuildSettings) {
        self.overrides.write().insert(guild_id, settings);
    }

    /// Drops a guild override, reverting it to the defaults.
    pub fn reset_guild(&self, guild_id: u64) -> Option<GuildSettings> {
        self.overrides.write().remove(&guild_id)
    }
}

impl SettingsProvider for StaticSettingsProvider {
    fn settings(&self, guild: Option<&dyn Guild>) -> GuildSettings {
        guild
            .and_then(|g| self.overrides.read().get(&g.id()).cloned())
            .unwrap_or_else(|| self.defaults.clone())
    }
}
