//! The command catalog.
//!
//! Commands are declared with [`CommandDefinition::builder`] and
//! [`ParameterDefinition::of`], collected in a [`CatalogBuilder`], and
//! validated once against the adapter and validator registries. The
//! resulting [`CommandCatalog`] is immutable and shared by every dispatch.
//!
//! ```rust,ignore
//! let catalog = CatalogBuilder::new()
//!     .command(CommandDefinition::builder("ping").handler(ping))
//!     .command(
//!         CommandDefinition::builder("echo")
//!             .param(ParameterDefinition::of::<String>("text").concat())
//!             .handler(echo),
//!     )
//!     .build(&adapters, &validators)?;
//! ```

mod builder;
mod command;
mod parameter;

use std::sync::Arc;

pub use builder::CatalogBuilder;
pub use command::{CommandBuilder, CommandDefinition};
pub use parameter::{
    Choice, ConstraintDefinition, ParameterBuilder, ParameterDefinition, ParameterType,
};

/// The validated, immutable set of top-level commands.
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    commands: Vec<Arc<CommandDefinition>>,
}

impl CommandCatalog {
    fn new(commands: Vec<Arc<CommandDefinition>>) -> Self {
        Self { commands }
    }

    /// Top-level commands in declaration order.
    pub fn commands(&self) -> &[Arc<CommandDefinition>] {
        &self.commands
    }

    /// Finds a top-level command by exact label.
    pub fn find(&self, label: &str) -> Option<&Arc<CommandDefinition>> {
        self.commands.iter().find(|c| c.matches(label, false))
    }

    /// Every command, sub-commands included, depth first.
    pub fn iter_all(&self) -> impl Iterator<Item = &Arc<CommandDefinition>> {
        fn walk<'a>(
            commands: &'a [Arc<CommandDefinition>],
            out: &mut Vec<&'a Arc<CommandDefinition>>,
        ) {
            for command in commands {
                out.push(command);
                walk(command.sub_commands(), out);
            }
        }
        let mut all = Vec::new();
        walk(&self.commands, &mut all);
        all.into_iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
