//! Parameter validators.
//!
//! A [`Validator`] checks an already-adapted argument against the
//! configuration declared on the parameter (`min = 3`, `role = "Admin"`).
//! Validators are registered by name in a [`ValidatorRegistry`] and resolved
//! when the catalog is built, so an unknown name is a build error rather
//! than a runtime surprise.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::InvocationContext;
use crate::handler::Argument;

pub use builtin::{
    MaximumValidator, MinimumValidator, NotPermissionValidator, NotRoleValidator,
    NotUserValidator, PermissionValidator, RoleValidator, UserValidator,
};

/// Checks a bound argument.
pub trait Validator: Send + Sync {
    /// Returns `true` when `argument` satisfies `config`.
    fn validate(&self, argument: &Argument, config: &Value, ctx: &InvocationContext) -> bool;
}

impl<F> Validator for F
where
    F: Fn(&Argument, &Value, &InvocationContext) -> bool + Send + Sync,
{
    fn validate(&self, argument: &Argument, config: &Value, ctx: &InvocationContext) -> bool {
        self(argument, config, ctx)
    }
}

/// Validators by name.
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    /// A registry with the built-in validators.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("min", MinimumValidator);
        registry.register("max", MaximumValidator);
        registry.register("perm", PermissionValidator);
        registry.register("not_perm", NotPermissionValidator);
        registry.register("role", RoleValidator);
        registry.register("not_role", NotRoleValidator);
        registry.register("user", UserValidator);
        registry.register("not_user", NotUserValidator);
        registry
    }

    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Registers `validator` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, validator: impl Validator + 'static) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.validators.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Validator>> {
        self.validators.get(name).cloned()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.validators.keys().collect();
        names.sort();
        f.debug_struct("ValidatorRegistry")
            .field("validators", &names)
            .finish()
    }
}
