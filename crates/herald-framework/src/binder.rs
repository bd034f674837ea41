//! Argument binding.
//!
//! Turns the remaining raw tokens (or, for structured input, the projected
//! option slots) into the typed argument list the handler receives. The
//! command event is always bound first; each declared parameter then
//! binds in order:
//!
//! - a `Vec<String>` parameter takes every remaining token unparsed and
//!   ends binding;
//! - a missing token fails a required parameter with a syntax error,
//!   binds nothing for an optional one without a default, and falls back
//!   to the default otherwise;
//! - a concatenating last parameter joins its token with all that follow;
//! - anything else goes through the type adapter, and a failed parse is a
//!   syntax error.
//!
//! Constraints run right after each value is adapted. Any user-facing
//! failure cancels the invocation; only a missing adapter is an `Err`.

use herald_core::ReplyPayload;
use tracing::trace;

use crate::adapter::TypeAdapterRegistry;
use crate::catalog::ParameterDefinition;
use crate::context::InvocationContext;
use crate::error::{DispatchError, DispatchResult};
use crate::handler::{Argument, CommandEvent};
use crate::messages::ErrorMessageFactory;

/// Where a parameter's raw value comes from.
enum Tokens {
    /// Positional tokens of a text invocation.
    Text(Vec<String>),
    /// Named options of a structured invocation, one slot per parameter.
    Structured(Vec<Option<String>>),
}

impl Tokens {
    fn from_context(ctx: &InvocationContext) -> Self {
        if ctx.is_structured() {
            Self::Structured(ctx.rewritten_slots())
        } else {
            Self::Text(ctx.input().to_vec())
        }
    }

    fn get(&self, index: usize) -> Option<&str> {
        match self {
            Self::Text(tokens) => tokens.get(index).map(String::as_str),
            Self::Structured(slots) => slots.get(index).and_then(|s| s.as_deref()),
        }
    }

    /// Tokens following `index`, joined onto a concatenating parameter.
    fn after(&self, index: usize) -> &[String] {
        match self {
            Self::Text(tokens) => tokens.get(index + 1..).unwrap_or_default(),
            Self::Structured(_) => &[],
        }
    }

    /// Everything from `index` on, for a raw-array parameter.
    fn rest(&self, index: usize) -> Vec<String> {
        match self {
            Self::Text(tokens) => tokens.get(index..).unwrap_or_default().to_vec(),
            Self::Structured(_) => self
                .get(index)
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

/// Binds arguments for the routed command.
pub struct ArgumentBinder<'a> {
    adapters: &'a TypeAdapterRegistry,
    messages: &'a dyn ErrorMessageFactory,
}

impl<'a> ArgumentBinder<'a> {
    pub fn new(adapters: &'a TypeAdapterRegistry, messages: &'a dyn ErrorMessageFactory) -> Self {
        Self { adapters, messages }
    }

    /// Binds into `ctx`. On a user-facing failure `ctx` ends up cancelled
    /// and `Ok` is returned.
    pub fn bind(&self, ctx: &mut InvocationContext) -> DispatchResult<()> {
        let Some(command) = ctx.command().cloned() else {
            return Ok(());
        };
        let parameters = command.parameters();
        if ctx.is_structured() && ctx.option_slots().is_empty() {
            ctx.project_options();
        }
        let tokens = Tokens::from_context(ctx);

        let event = CommandEvent::new(ctx, command.clone());
        ctx.push_argument(Argument::new(event));

        for (i, parameter) in parameters.iter().enumerate() {
            if parameter.ty().is_raw_array() {
                ctx.push_argument(Argument::new(tokens.rest(i)));
                break;
            }

            let raw = match tokens.get(i) {
                Some(raw) => raw.to_string(),
                None if !parameter.is_optional() => {
                    trace!(parameter = parameter.name(), "Required parameter missing");
                    self.syntax_error(ctx);
                    return Ok(());
                }
                None => match parameter.default_value() {
                    Some(default) => default.to_string(),
                    None => {
                        ctx.push_argument(Argument::absent());
                        continue;
                    }
                },
            };

            let is_last = i + 1 == parameters.len();
            if is_last && parameter.is_concat() {
                let mut joined = raw;
                for token in tokens.after(i) {
                    joined.push(' ');
                    joined.push_str(token);
                }
                let value = Argument::new(joined.trim_end().to_string());
                if !self.check_constraints(ctx, parameter, &value) {
                    return Ok(());
                }
                ctx.push_argument(value);
                break;
            }

            let Some(adapter) = self.adapters.get(parameter.ty()) else {
                return Err(DispatchError::MissingAdapter {
                    command: command.path().to_string(),
                    ty: parameter.ty().to_string(),
                });
            };
            let Some(value) = adapter(&raw, &*ctx) else {
                trace!(parameter = parameter.name(), raw = %raw, "Type adapting failed");
                self.syntax_error(ctx);
                return Ok(());
            };
            if !self.check_constraints(ctx, parameter, &value) {
                return Ok(());
            }
            ctx.push_argument(value);
        }

        Ok(())
    }

    fn syntax_error(&self, ctx: &mut InvocationContext) {
        let message = self.messages.syntax_error(ctx);
        ctx.cancel(message);
    }

    fn check_constraints(
        &self,
        ctx: &mut InvocationContext,
        parameter: &ParameterDefinition,
        value: &Argument,
    ) -> bool {
        let failed = parameter
            .constraints()
            .iter()
            .find(|c| !c.validate(value, &*ctx));
        let Some(constraint) = failed else {
            return true;
        };
        trace!(
            parameter = parameter.name(),
            validator = constraint.name(),
            "Constraint failed"
        );
        let message: ReplyPayload = self.messages.constraint_failed(ctx, constraint);
        ctx.cancel(message);
        false
    }
}
