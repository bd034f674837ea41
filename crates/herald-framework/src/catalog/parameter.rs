//! Declared command parameters.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::Value;

use crate::context::InvocationContext;
use crate::error::{CatalogError, CatalogResult};
use crate::handler::Argument;
use crate::validation::{Validator, ValidatorRegistry};

const DEFAULT_CONSTRAINT_MESSAGE: &str = "Parameter validation failed";

// ============================================================================
// ParameterType
// ============================================================================

/// The type a parameter binds to, used to look up its type adapter.
#[derive(Clone, Copy)]
pub struct ParameterType {
    id: TypeId,
    name: &'static str,
}

impl ParameterType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// `Vec<String>` parameters receive the raw tokens unparsed.
    pub fn is_raw_array(&self) -> bool {
        self.is::<Vec<String>>()
    }

    pub fn is_string(&self) -> bool {
        self.is::<String>()
    }

    pub fn full_name(&self) -> &'static str {
        self.name
    }

    /// The type name without module paths, e.g. `Vec<String>`.
    pub fn short_name(&self) -> String {
        let mut out = String::new();
        let mut segment = String::new();
        for ch in self.name.chars() {
            match ch {
                ':' => segment.clear(),
                c if c.is_alphanumeric() || c == '_' => segment.push(c),
                c => {
                    out.push_str(&segment);
                    segment.clear();
                    out.push(c);
                }
            }
        }
        out.push_str(&segment);
        out
    }
}

impl PartialEq for ParameterType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParameterType {}

impl Hash for ParameterType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParameterType({})", self.name)
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

// ============================================================================
// Choices and constraints
// ============================================================================

/// A preset value offered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

impl Choice {
    /// Parses the `name:value` shorthand. A bare name is its own value.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((name, value)) => Self {
                name: name.to_string(),
                value: value.to_string(),
            },
            None => Self {
                name: raw.to_string(),
                value: raw.to_string(),
            },
        }
    }
}

/// A resolved validator attached to a parameter.
#[derive(Clone)]
pub struct ConstraintDefinition {
    name: String,
    config: Value,
    message: String,
    validator: Arc<dyn Validator>,
}

impl ConstraintDefinition {
    /// Name the validator was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Message shown to the user when validation fails.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn validate(&self, argument: &Argument, ctx: &InvocationContext) -> bool {
        self.validator.validate(argument, &self.config, ctx)
    }
}

impl fmt::Debug for ConstraintDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDefinition")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Debug, Clone)]
struct PendingConstraint {
    name: String,
    config: Value,
    message: String,
}

// ============================================================================
// ParameterDefinition
// ============================================================================

/// A parameter of a command, as stored in the catalog.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    ty: ParameterType,
    name: String,
    description: String,
    optional: bool,
    default_value: Option<String>,
    concat: bool,
    choices: Vec<Choice>,
    constraints: Vec<ConstraintDefinition>,
}

impl ParameterDefinition {
    /// Starts declaring a parameter of type `T`.
    ///
    /// ```rust,ignore
    /// ParameterDefinition::of::<i64>("amount")
    ///     .optional()
    ///     .default_value("1")
    ///     .constraint("min", 1)
    /// ```
    pub fn of<T: Any>(name: impl Into<String>) -> ParameterBuilder {
        ParameterBuilder::new(ParameterType::of::<T>(), name)
    }

    pub fn ty(&self) -> ParameterType {
        self.ty
    }

    /// Lowercase parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_concat(&self) -> bool {
        self.concat
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn constraints(&self) -> &[ConstraintDefinition] {
        &self.constraints
    }
}

/// Builder for [`ParameterDefinition`], resolved against a validator
/// registry when the catalog is built.
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    ty: ParameterType,
    name: String,
    description: String,
    optional: bool,
    default_value: Option<String>,
    concat: bool,
    choices: Vec<Choice>,
    constraints: Vec<PendingConstraint>,
}

impl ParameterBuilder {
    fn new(ty: ParameterType, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into().to_lowercase(),
            description: String::new(),
            optional: false,
            default_value: None,
            concat: false,
            choices: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Sets the raw default used when no token is supplied. Implies
    /// [`optional`](Self::optional); an empty default means none.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.optional = true;
        self.default_value = (!value.is_empty()).then_some(value);
        self
    }

    /// Joins this token with every following one. Only valid on the last
    /// parameter, and only for `String`.
    pub fn concat(mut self) -> Self {
        self.concat = true;
        self
    }

    /// Adds a choice in `name:value` form.
    pub fn choice(mut self, choice: &str) -> Self {
        self.choices.push(Choice::parse(choice));
        self
    }

    /// Attaches the validator registered as `validator`.
    pub fn constraint(self, validator: impl Into<String>, config: impl Into<Value>) -> Self {
        self.constraint_with_message(validator, config, DEFAULT_CONSTRAINT_MESSAGE)
    }

    pub fn constraint_with_message(
        mut self,
        validator: impl Into<String>,
        config: impl Into<Value>,
        message: impl Into<String>,
    ) -> Self {
        self.constraints.push(PendingConstraint {
            name: validator.into(),
            config: config.into(),
            message: message.into(),
        });
        self
    }

    pub fn ty(&self) -> ParameterType {
        self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_concat(&self) -> bool {
        self.concat
    }

    pub(crate) fn build(
        self,
        command: &str,
        validators: &ValidatorRegistry,
    ) -> CatalogResult<ParameterDefinition> {
        if self.name.is_empty() {
            return Err(CatalogError::invalid_parameter(
                command,
                "",
                "parameter name is empty",
            ));
        }
        if self.concat && !self.ty.is_string() {
            return Err(CatalogError::invalid_parameter(
                command,
                &self.name,
                format!("concat requires String, found {}", self.ty),
            ));
        }

        let constraints = self
            .constraints
            .into_iter()
            .map(|pending| {
                let validator = validators.get(&pending.name).ok_or_else(|| {
                    CatalogError::UnknownValidator {
                        command: command.to_string(),
                        parameter: self.name.clone(),
                        validator: pending.name.clone(),
                    }
                })?;
                Ok(ConstraintDefinition {
                    name: pending.name,
                    config: pending.config,
                    message: pending.message,
                    validator,
                })
            })
            .collect::<CatalogResult<Vec<_>>>()?;

        Ok(ParameterDefinition {
            ty: self.ty,
            name: self.name,
            description: self.description,
            optional: self.optional,
            default_value: self.default_value,
            concat: self.concat,
            choices: self.choices,
            constraints,
        })
    }
}
