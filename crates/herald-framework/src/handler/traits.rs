//! The [`Handler`] trait and handler return values.
//!
//! Handlers are plain async functions. The first parameter is always the
//! [`CommandEvent`]; each following parameter receives the next bound
//! argument through [`FromArgument`], in declaration order.
//!
//! ```rust,ignore
//! async fn ping(event: CommandEvent) -> &'static str {
//!     "pong"
//! }
//!
//! async fn add(event: CommandEvent, a: i64, b: Option<i64>) -> String {
//!     (a + b.unwrap_or(0)).to_string()
//! }
//!
//! async fn ban(event: CommandEvent, target: Member, reason: String) -> Result<(), BanError> {
//!     moderation::ban(&target, &reason).await?;
//!     event.reply(format!("Banned {}", target.effective_name()));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use herald_core::ReplyPayload;
use tower::BoxError;

use super::argument::{ArgumentCursor, FromArgument};
use super::event::CommandEvent;
use crate::handler::Argument;

// ============================================================================
// HandlerResponse
// ============================================================================

/// Values a handler may return.
#[async_trait]
pub trait HandlerResponse: Send + 'static {
    /// Performs the response's side effects. An `Err` is reported as an
    /// execution failure.
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError>;
}

#[async_trait]
impl HandlerResponse for () {
    async fn respond(self, _event: &CommandEvent) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Replies with the string.
#[async_trait]
impl HandlerResponse for String {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        event.reply(self);
        Ok(())
    }
}

#[async_trait]
impl HandlerResponse for &'static str {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        event.reply(self);
        Ok(())
    }
}

#[async_trait]
impl HandlerResponse for ReplyPayload {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        event.reply(self);
        Ok(())
    }
}

#[async_trait]
impl<T: HandlerResponse> HandlerResponse for Option<T> {
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        match self {
            Some(inner) => inner.respond(event).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T, E> HandlerResponse for Result<T, E>
where
    T: HandlerResponse,
    E: Into<BoxError> + Send + 'static,
{
    async fn respond(self, event: &CommandEvent) -> Result<(), BoxError> {
        match self {
            Ok(inner) => inner.respond(event).await,
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Handler
// ============================================================================

/// An async function usable as a command handler.
///
/// Implemented for functions taking a [`CommandEvent`] followed by up to
/// twelve [`FromArgument`] parameters and returning a [`HandlerResponse`].
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Calls the handler with the bound arguments.
    fn call(self, arguments: Vec<Argument>) -> BoxFuture<'static, Result<(), BoxError>>;
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce(CommandEvent, $($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: HandlerResponse,
            $( $ty: FromArgument + Send + 'static, )*
        {
            fn call(self, arguments: Vec<Argument>) -> BoxFuture<'static, Result<(), BoxError>> {
                Box::pin(async move {
                    let mut cursor = ArgumentCursor::new(arguments);
                    let event: CommandEvent = cursor.next()?;
                    $(
                        let $ty: $ty = cursor.next()?;
                    )*

                    let response = (self)(event.clone(), $($ty,)*).await;
                    response.respond(&event).await
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
