//! Type adapters.
//!
//! A type adapter turns one raw token into a typed value, or reports that
//! it cannot. The binder looks adapters up by the parameter's
//! [`ParameterType`] and treats a failed parse as a syntax error.
//!
//! ```rust,ignore
//! let mut adapters = TypeAdapterRegistry::new();
//!
//! // A closure is enough for simple types.
//! adapters.register_fn(|raw, _ctx| raw.parse::<Duration>().ok());
//!
//! // Or implement the trait.
//! adapters.register(DiceAdapter);
//! ```

mod entity;
mod primitive;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use herald_core::{
    AudioChannel, NewsChannel, StageChannel, TextChannel, ThreadChannel, VoiceChannel,
};

use crate::catalog::ParameterType;
use crate::context::InvocationContext;
use crate::handler::Argument;

pub(crate) use entity::{resolve_member, resolve_role};
pub use entity::{
    ChannelAdapter, ChannelKind, ChannelKindAdapter, MemberAdapter, RoleAdapter, UserAdapter,
};
pub use primitive::{BooleanAdapter, CharAdapter, FromStrAdapter, StringAdapter};

/// Parses a raw token into a typed value.
pub trait TypeAdapter: Send + Sync + 'static {
    type Output: Any + Send + Sync;

    /// Returns `None` if `raw` is not a valid value.
    fn parse(&self, raw: &str, ctx: &InvocationContext) -> Option<Self::Output>;
}

/// A type-erased adapter as stored in the registry.
pub type ErasedAdapter = Arc<dyn Fn(&str, &InvocationContext) -> Option<Argument> + Send + Sync>;

/// Adapters keyed by the type they produce.
#[derive(Clone)]
pub struct TypeAdapterRegistry {
    adapters: HashMap<TypeId, (&'static str, ErasedAdapter)>,
}

impl TypeAdapterRegistry {
    /// A registry with adapters for the primitive, string and entity types.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(FromStrAdapter::<i8>::new());
        registry.register(FromStrAdapter::<i16>::new());
        registry.register(FromStrAdapter::<i32>::new());
        registry.register(FromStrAdapter::<i64>::new());
        registry.register(FromStrAdapter::<u8>::new());
        registry.register(FromStrAdapter::<u16>::new());
        registry.register(FromStrAdapter::<u32>::new());
        registry.register(FromStrAdapter::<u64>::new());
        registry.register(FromStrAdapter::<f32>::new());
        registry.register(FromStrAdapter::<f64>::new());
        registry.register(BooleanAdapter);
        registry.register(CharAdapter);
        registry.register(StringAdapter);

        registry.register(UserAdapter);
        registry.register(MemberAdapter);
        registry.register(RoleAdapter);
        registry.register(ChannelAdapter);
        registry.register(ChannelKindAdapter::<TextChannel>::new());
        registry.register(ChannelKindAdapter::<NewsChannel>::new());
        registry.register(ChannelKindAdapter::<VoiceChannel>::new());
        registry.register(ChannelKindAdapter::<StageChannel>::new());
        registry.register(ChannelKindAdapter::<AudioChannel>::new());
        registry.register(ChannelKindAdapter::<ThreadChannel>::new());

        registry
    }

    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registers `adapter` for its output type, replacing any previous one.
    pub fn register<A: TypeAdapter>(&mut self, adapter: A) {
        let erased: ErasedAdapter = Arc::new(move |raw: &str, ctx: &InvocationContext| {
            adapter.parse(raw, ctx).map(Argument::new)
        });
        self.adapters.insert(
            TypeId::of::<A::Output>(),
            (std::any::type_name::<A::Output>(), erased),
        );
    }

    /// Registers a closure producing `T`.
    pub fn register_fn<T, F>(&mut self, adapter: F)
    where
        T: Any + Send + Sync,
        F: Fn(&str, &InvocationContext) -> Option<T> + Send + Sync + 'static,
    {
        let erased: ErasedAdapter = Arc::new(move |raw: &str, ctx: &InvocationContext| {
            adapter(raw, ctx).map(Argument::new)
        });
        self.adapters
            .insert(TypeId::of::<T>(), (std::any::type_name::<T>(), erased));
    }

    pub fn unregister<T: Any>(&mut self) -> bool {
        self.adapters.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn exists(&self, ty: ParameterType) -> bool {
        self.adapters.contains_key(&ty.id())
    }

    pub fn get(&self, ty: ParameterType) -> Option<&ErasedAdapter> {
        self.adapters.get(&ty.id()).map(|(_, adapter)| adapter)
    }

    /// Parses `raw` as `ty`. `None` if there is no adapter or the token is
    /// not a valid value.
    pub fn parse(&self, ty: ParameterType, raw: &str, ctx: &InvocationContext) -> Option<Argument> {
        self.get(ty).and_then(|adapter| adapter(raw, ctx))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for TypeAdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeAdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.adapters.values().map(|(name, _)| *name).collect();
        types.sort_unstable();
        f.debug_struct("TypeAdapterRegistry")
            .field("types", &types)
            .finish()
    }
}
