use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::CommandCatalog;
use super::command::CommandBuilder;
use crate::adapter::TypeAdapterRegistry;
use crate::error::{CatalogError, CatalogResult};
use crate::validation::ValidatorRegistry;

/// Collects command declarations and validates them into a
/// [`CommandCatalog`].
///
/// Building checks that:
/// - every label is non-empty and unique among its siblings (exact
///   comparison; case-insensitive collisions are left to the router,
///   which reports them as ambiguous),
/// - every parameter type has an adapter and every constraint names a
///   registered validator,
/// - concatenating and raw-array parameters come last,
/// - every command has a handler or sub-commands.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    commands: Vec<CommandBuilder>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = CommandBuilder>) -> Self {
        self.commands.extend(commands);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn build(
        self,
        adapters: &TypeAdapterRegistry,
        validators: &ValidatorRegistry,
    ) -> CatalogResult<CommandCatalog> {
        let mut seen = HashSet::new();
        for label in self.commands.iter().flat_map(|c| c.labels()) {
            if !seen.insert(label.clone()) {
                return Err(CatalogError::DuplicateLabel {
                    label: label.clone(),
                    scope: None,
                });
            }
        }

        let commands = self
            .commands
            .into_iter()
            .map(|c| c.build(None, adapters, validators).map(Arc::new))
            .collect::<CatalogResult<Vec<_>>>()?;

        debug!(count = commands.len(), "Command catalog built");
        Ok(CommandCatalog::new(commands))
    }
}
