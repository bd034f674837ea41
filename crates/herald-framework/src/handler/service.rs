//! Tower service wrapping a command handler.
//!
//! [`HandlerService<F, T>`] adapts any [`Handler`] to
//! `tower::Service<Invocation>`. Commands store it type-erased as a
//! [`BoxedHandlerService`], so cross-cutting behaviour (timeouts, metrics,
//! tracing) can be stacked on as ordinary tower layers.

use std::fmt;
use std::marker::PhantomData;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service};

use super::argument::Argument;
use super::traits::Handler;

/// The bound arguments of one invocation, command event first.
#[derive(Clone, Default)]
pub struct Invocation {
    arguments: Vec<Argument>,
}

impl Invocation {
    pub fn new(arguments: Vec<Argument>) -> Self {
        Self { arguments }
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn into_arguments(self) -> Vec<Argument> {
        self.arguments
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.arguments).finish()
    }
}

/// Type-erased handler service as stored in a command definition.
pub type BoxedHandlerService = BoxCloneSyncService<Invocation, (), BoxError>;

/// A tower [`Service`] that calls a single handler.
pub struct HandlerService<F, T> {
    handler: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerService<F, T> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, T> Clone for HandlerService<F, T> {
    fn clone(&self) -> Self {
        Self::new(self.handler.clone())
    }
}

impl<F, T> Service<Invocation> for HandlerService<F, T>
where
    F: Handler<T>,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        self.handler.clone().call(invocation.into_arguments())
    }
}

/// Boxes a handler into the form commands store.
pub fn into_service<F, T>(handler: F) -> BoxedHandlerService
where
    F: Handler<T>,
    T: 'static,
{
    BoxCloneSyncService::new(HandlerService::new(handler))
}
