//! Command definitions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tower::{BoxError, Layer, Service};
use tower::util::BoxCloneSyncService;

use super::parameter::{ParameterBuilder, ParameterDefinition};
use crate::adapter::TypeAdapterRegistry;
use crate::error::{CatalogError, CatalogResult};
use crate::handler::{BoxedHandlerService, Handler, Invocation, into_service};
use crate::validation::ValidatorRegistry;

type LayerFn = Box<dyn FnOnce(BoxedHandlerService) -> BoxedHandlerService + Send>;

/// A command in the catalog. Immutable once built.
pub struct CommandDefinition {
    labels: Vec<String>,
    path: String,
    description: String,
    usage: String,
    category: String,
    parameters: Vec<ParameterDefinition>,
    permissions: Vec<String>,
    sub_commands: Vec<Arc<CommandDefinition>>,
    handler: Option<BoxedHandlerService>,
    ephemeral: bool,
    auto_acknowledge: bool,
    dm: bool,
    cooldown: Option<Duration>,
}

impl CommandDefinition {
    /// Starts declaring a command invoked as `label`.
    pub fn builder(label: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(label)
    }

    /// The primary label.
    pub fn name(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or_default()
    }

    /// Primary label followed by aliases.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Space-separated primary labels from the top-level command down.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether `token` is one of this command's labels.
    pub fn matches(&self, token: &str, ignore_case: bool) -> bool {
        self.labels.iter().any(|label| {
            if ignore_case {
                label.eq_ignore_ascii_case(token)
            } else {
                label == token
            }
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Usage text; `{prefix}` stands for the contextual prefix.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Usage text with the prefix filled in.
    pub fn usage_with_prefix(&self, prefix: &str) -> String {
        self.usage.replace("{prefix}", prefix)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    /// Permission tags the invoking user must hold.
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn sub_commands(&self) -> &[Arc<CommandDefinition>] {
        &self.sub_commands
    }

    pub fn has_sub_commands(&self) -> bool {
        !self.sub_commands.is_empty()
    }

    /// `None` for pure groups that only hold sub-commands.
    pub fn handler(&self) -> Option<&BoxedHandlerService> {
        self.handler.as_ref()
    }

    pub fn is_invocable(&self) -> bool {
        self.handler.is_some()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Acknowledge structured invocations before the handler runs.
    pub fn auto_acknowledge(&self) -> bool {
        self.auto_acknowledge
    }

    /// May be invoked in direct messages.
    pub fn allows_dm(&self) -> bool {
        self.dm
    }

    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("path", &self.path)
            .field("labels", &self.labels)
            .field("parameters", &self.parameters)
            .field("permissions", &self.permissions)
            .field("sub_commands", &self.sub_commands.len())
            .field("invocable", &self.is_invocable())
            .finish()
    }
}

// ============================================================================
// CommandBuilder
// ============================================================================

/// Builder for [`CommandDefinition`]. Validated by
/// [`CatalogBuilder::build`](super::CatalogBuilder::build).
///
/// ```rust,ignore
/// CommandDefinition::builder("ban")
///     .alias("b")
///     .description("Bans a member")
///     .permission("ban_members")
///     .param(ParameterDefinition::of::<Member>("target"))
///     .param(ParameterDefinition::of::<String>("reason").concat())
///     .handler(ban)
/// ```
pub struct CommandBuilder {
    labels: Vec<String>,
    description: String,
    usage: Option<String>,
    category: String,
    parameters: Vec<ParameterBuilder>,
    permissions: Vec<String>,
    sub_commands: Vec<CommandBuilder>,
    handler: Option<BoxedHandlerService>,
    layers: Vec<LayerFn>,
    ephemeral: bool,
    auto_acknowledge: bool,
    dm: bool,
    cooldown: Option<Duration>,
}

impl CommandBuilder {
    fn new(label: impl Into<String>) -> Self {
        Self {
            labels: vec![label.into()],
            description: String::new(),
            usage: None,
            category: "Other".to_string(),
            parameters: Vec::new(),
            permissions: Vec::new(),
            sub_commands: Vec::new(),
            handler: None,
            layers: Vec::new(),
            ephemeral: false,
            auto_acknowledge: true,
            dm: true,
            cooldown: None,
        }
    }

    pub fn alias(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Overrides the generated usage text. `{prefix}` is replaced with the
    /// contextual prefix when shown.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn param(mut self, parameter: ParameterBuilder) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn sub_command(mut self, command: CommandBuilder) -> Self {
        self.sub_commands.push(command);
        self
    }

    pub fn handler<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        self.handler = Some(into_service(handler));
        self
    }

    /// Wraps the handler in a tower layer. Layers apply in the order they
    /// are added, the last one outermost.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedHandlerService> + Send + 'static,
        L::Service: Service<Invocation, Response = (), Error = BoxError> + Clone + Send + Sync + 'static,
        <L::Service as Service<Invocation>>::Future: Send + 'static,
    {
        self.layers
            .push(Box::new(move |inner| BoxCloneSyncService::new(layer.layer(inner))));
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn auto_acknowledge(mut self, auto_acknowledge: bool) -> Self {
        self.auto_acknowledge = auto_acknowledge;
        self
    }

    /// Allows or forbids invocation in direct messages.
    pub fn dm(mut self, dm: bool) -> Self {
        self.dm = dm;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// The primary label.
    pub fn name(&self) -> &str {
        &self.labels[0]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub(crate) fn build(
        self,
        parent: Option<&str>,
        adapters: &TypeAdapterRegistry,
        validators: &ValidatorRegistry,
    ) -> CatalogResult<CommandDefinition> {
        if self
            .labels
            .iter()
            .any(|l| l.is_empty() || l.chars().any(char::is_whitespace))
        {
            return Err(CatalogError::EmptyLabels);
        }
        let path = match parent {
            Some(parent) => format!("{parent} {}", self.labels[0]),
            None => self.labels[0].clone(),
        };

        let parameters = build_parameters(&path, self.parameters, adapters, validators)?;

        let mut sub_commands: Vec<Arc<CommandDefinition>> = Vec::new();
        for sub in self.sub_commands {
            let sub = sub.build(Some(&path), adapters, validators)?;
            if let Some(label) = sub
                .labels
                .iter()
                .find(|l| sub_commands.iter().any(|s| s.labels.contains(l)))
            {
                return Err(CatalogError::DuplicateLabel {
                    label: label.clone(),
                    scope: Some(path),
                });
            }
            sub_commands.push(Arc::new(sub));
        }

        if self.handler.is_none() && sub_commands.is_empty() {
            return Err(CatalogError::NoHandler { command: path });
        }

        let handler = self
            .handler
            .map(|handler| self.layers.into_iter().fold(handler, |svc, layer| layer(svc)));

        let usage = self
            .usage
            .unwrap_or_else(|| default_usage(&path, &parameters));

        Ok(CommandDefinition {
            labels: self.labels,
            path,
            description: self.description,
            usage,
            category: self.category,
            parameters,
            permissions: self.permissions,
            sub_commands,
            handler,
            ephemeral: self.ephemeral,
            auto_acknowledge: self.auto_acknowledge,
            dm: self.dm,
            cooldown: self.cooldown,
        })
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("labels", &self.labels)
            .field("parameters", &self.parameters)
            .field("sub_commands", &self.sub_commands)
            .field("has_handler", &self.handler.is_some())
            .field("layers", &self.layers.len())
            .finish()
    }
}

fn build_parameters(
    command: &str,
    parameters: Vec<ParameterBuilder>,
    adapters: &TypeAdapterRegistry,
    validators: &ValidatorRegistry,
) -> CatalogResult<Vec<ParameterDefinition>> {
    let last = parameters.len().saturating_sub(1);
    let mut built = Vec::with_capacity(parameters.len());

    for (i, parameter) in parameters.into_iter().enumerate() {
        let ty = parameter.ty();
        if ty.is_raw_array() && i != last {
            return Err(CatalogError::invalid_parameter(
                command,
                parameter.name(),
                "a raw token array must be the last parameter",
            ));
        }
        if parameter.is_concat() && i != last {
            return Err(CatalogError::invalid_parameter(
                command,
                parameter.name(),
                "only the last parameter may concatenate",
            ));
        }
        if !ty.is_raw_array() && !adapters.exists(ty) {
            return Err(CatalogError::MissingAdapter {
                command: command.to_string(),
                parameter: parameter.name().to_string(),
                ty: ty.to_string(),
            });
        }
        if built
            .iter()
            .any(|p: &ParameterDefinition| p.name() == parameter.name())
        {
            return Err(CatalogError::invalid_parameter(
                command,
                parameter.name(),
                "duplicate parameter name",
            ));
        }
        built.push(parameter.build(command, validators)?);
    }

    Ok(built)
}

fn default_usage(path: &str, parameters: &[ParameterDefinition]) -> String {
    let mut usage = format!("{{prefix}}{path}");
    for parameter in parameters {
        if parameter.is_optional() {
            usage.push_str(&format!(" [{}]", parameter.name()));
        } else {
            usage.push_str(&format!(" <{}>", parameter.name()));
        }
    }
    usage
}
