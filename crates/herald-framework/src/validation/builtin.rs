use herald_core::{Member, User};
use serde_json::Value;

use super::Validator;
use crate::adapter::{resolve_member, resolve_role};
use crate::context::InvocationContext;
use crate::handler::Argument;

/// Reads any built-in numeric argument as `f64`.
fn as_number(argument: &Argument) -> Option<f64> {
    macro_rules! try_numeric {
        ($($ty:ty),*) => {
            $(
                if let Some(v) = argument.downcast_ref::<$ty>() {
                    return Some(*v as f64);
                }
            )*
        };
    }
    try_numeric!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
    None
}

fn config_str(config: &Value) -> Option<String> {
    match config {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn argument_user_id(argument: &Argument) -> Option<u64> {
    argument
        .downcast_ref::<Member>()
        .map(Member::id)
        .or_else(|| argument.downcast_ref::<User>().map(|u| u.id))
}

/// Numeric lower bound, inclusive. Config: a number.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumValidator;

impl Validator for MinimumValidator {
    fn validate(&self, argument: &Argument, config: &Value, _ctx: &InvocationContext) -> bool {
        match (as_number(argument), config.as_f64()) {
            (Some(value), Some(min)) => value >= min,
            _ => false,
        }
    }
}

/// Numeric upper bound, inclusive. Config: a number.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximumValidator;

impl Validator for MaximumValidator {
    fn validate(&self, argument: &Argument, config: &Value, _ctx: &InvocationContext) -> bool {
        match (as_number(argument), config.as_f64()) {
            (Some(value), Some(max)) => value <= max,
            _ => false,
        }
    }
}

/// The member argument holds a permission. Config: a permission tag, or an
/// array of tags that must all be held.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionValidator;

fn has_permissions(member: &Member, config: &Value) -> Option<bool> {
    match config {
        Value::String(p) => Some(member.has_permission(p)),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .all(|p| member.has_permission(p)),
        ),
        _ => None,
    }
}

impl Validator for PermissionValidator {
    fn validate(&self, argument: &Argument, config: &Value, _ctx: &InvocationContext) -> bool {
        argument
            .downcast_ref::<Member>()
            .and_then(|m| has_permissions(m, config))
            .unwrap_or(false)
    }
}

/// The member argument lacks a permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotPermissionValidator;

impl Validator for NotPermissionValidator {
    fn validate(&self, argument: &Argument, config: &Value, _ctx: &InvocationContext) -> bool {
        argument
            .downcast_ref::<Member>()
            .and_then(|m| has_permissions(m, config))
            .is_some_and(|held| !held)
    }
}

/// The member argument has a role. Config: role id or name.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleValidator;

fn member_has_role(argument: &Argument, config: &Value, ctx: &InvocationContext) -> Option<bool> {
    let member = argument.downcast_ref::<Member>()?;
    let role = resolve_role(&config_str(config)?, ctx)?;
    Some(member.has_role(&role))
}

impl Validator for RoleValidator {
    fn validate(&self, argument: &Argument, config: &Value, ctx: &InvocationContext) -> bool {
        member_has_role(argument, config, ctx).unwrap_or(false)
    }
}

/// The member argument does not have a role.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotRoleValidator;

impl Validator for NotRoleValidator {
    fn validate(&self, argument: &Argument, config: &Value, ctx: &InvocationContext) -> bool {
        member_has_role(argument, config, ctx).is_some_and(|has| !has)
    }
}

/// The user or member argument is a specific member. Config: id or name.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserValidator;

fn is_user(argument: &Argument, config: &Value, ctx: &InvocationContext) -> Option<bool> {
    let id = argument_user_id(argument)?;
    let target = resolve_member(&config_str(config)?, ctx)?;
    Some(target.id() == id)
}

impl Validator for UserValidator {
    fn validate(&self, argument: &Argument, config: &Value, ctx: &InvocationContext) -> bool {
        is_user(argument, config, ctx).unwrap_or(false)
    }
}

/// The user or member argument is anyone but a specific member.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotUserValidator;

impl Validator for NotUserValidator {
    fn validate(&self, argument: &Argument, config: &Value, ctx: &InvocationContext) -> bool {
        // An unresolvable target cannot be matched, so everyone passes.
        match argument_user_id(argument) {
            Some(_) => !is_user(argument, config, ctx).unwrap_or(false),
            None => false,
        }
    }
}
