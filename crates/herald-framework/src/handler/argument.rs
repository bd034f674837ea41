//! Type-erased bound arguments.
//!
//! The binder produces one [`Argument`] per declared parameter. Handlers get
//! their typed values back through [`FromArgument`], which is implemented
//! for every type the built-in adapters produce, for `Option<T>` (absent
//! optional parameters) and for the [`Arg<T>`] wrapper that covers any
//! custom adapter output.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use herald_core::{
    AudioChannel, Channel, Member, NewsChannel, Role, StageChannel, TextChannel, ThreadChannel,
    User, VoiceChannel,
};

use crate::error::ArgumentError;

/// A bound value of any type, or the absence of one.
#[derive(Clone)]
pub struct Argument {
    value: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
}

impl Argument {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Some(Arc::new(value)),
            type_name: type_name::<T>(),
        }
    }

    /// An optional parameter that was not supplied and has no default.
    pub fn absent() -> Self {
        Self {
            value: None,
            type_name: "absent",
        }
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is::<T>())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref::<T>()
    }

    /// Full type name of the held value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Extracts an owned `T`, cloning only if the value is shared.
    pub fn take<T: Any + Send + Sync + Clone>(self, position: usize) -> Result<T, ArgumentError> {
        let found = self.type_name;
        let Some(value) = self.value else {
            return Err(ArgumentError::Missing {
                position,
                expected: type_name::<T>(),
            });
        };
        let value = value
            .downcast::<T>()
            .map_err(|_| ArgumentError::TypeMismatch {
                position,
                expected: type_name::<T>(),
                found,
            })?;
        Ok(Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone()))
    }
}

impl Default for Argument {
    fn default() -> Self {
        Self::absent()
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(_) => write!(f, "Argument({})", self.type_name),
            None => f.write_str("Argument(absent)"),
        }
    }
}

/// Converts a bound [`Argument`] back into a handler parameter.
pub trait FromArgument: Sized {
    /// `position` is the argument's index, used in error messages.
    fn from_argument(argument: Argument, position: usize) -> Result<Self, ArgumentError>;
}

/// Absent arguments become `None`.
impl<T: FromArgument> FromArgument for Option<T> {
    fn from_argument(argument: Argument, position: usize) -> Result<Self, ArgumentError> {
        if argument.is_absent() {
            return Ok(None);
        }
        T::from_argument(argument, position).map(Some)
    }
}

/// Wrapper for values produced by custom type adapters.
///
/// ```rust,ignore
/// async fn roll(event: CommandEvent, Arg(dice): Arg<Dice>) -> String {
///     dice.roll().to_string()
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg<T>(pub T);

impl<T: Any + Send + Sync + Clone> FromArgument for Arg<T> {
    fn from_argument(argument: Argument, position: usize) -> Result<Self, ArgumentError> {
        argument.take(position).map(Arg)
    }
}

macro_rules! impl_from_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromArgument for $ty {
                fn from_argument(argument: Argument, position: usize) -> Result<Self, ArgumentError> {
                    argument.take(position)
                }
            }
        )*
    };
}

impl_from_argument!(
    i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, char, String, Vec<String>,
    User, Member, Role, Channel,
    TextChannel, NewsChannel, VoiceChannel, StageChannel, AudioChannel, ThreadChannel,
);

/// Walks the bound arguments in order, handing each to the next handler
/// parameter.
pub(crate) struct ArgumentCursor {
    inner: std::vec::IntoIter<Argument>,
    position: usize,
}

impl ArgumentCursor {
    pub(crate) fn new(arguments: Vec<Argument>) -> Self {
        Self {
            inner: arguments.into_iter(),
            position: 0,
        }
    }

    pub(crate) fn next<T: FromArgument>(&mut self) -> Result<T, ArgumentError> {
        let argument = self.inner.next().unwrap_or_default();
        let position = self.position;
        self.position += 1;
        T::from_argument(argument, position)
    }
}
