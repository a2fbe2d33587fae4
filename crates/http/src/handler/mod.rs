//! The application contract.
//!
//! An [`Application`] is invoked once per request with the connection's
//! [`Environment`]. It reads the request through it, writes the response
//! through it, and returns. The connection finalizes the response afterwards.
//!
//! Returning an error or panicking is fine: the connection traces it and
//! closes. No error response is synthesized on the application's behalf.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::connection::Environment;
use crate::protocol::BoxError;

#[async_trait]
pub trait Application: Send + Sync {
    async fn call(&self, env: &mut Environment<'_>) -> Result<(), BoxError>;
}

#[async_trait]
impl<A> Application for Arc<A>
where
    A: Application + ?Sized,
{
    async fn call(&self, env: &mut Environment<'_>) -> Result<(), BoxError> {
        (**self).call(env).await
    }
}

#[async_trait]
impl<A> Application for Box<A>
where
    A: Application + ?Sized,
{
    async fn call(&self, env: &mut Environment<'_>) -> Result<(), BoxError> {
        (**self).call(env).await
    }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F> Application for HandlerFn<F>
where
    F: for<'a, 'conn> Fn(&'a mut Environment<'conn>) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    async fn call(&self, env: &mut Environment<'_>) -> Result<(), BoxError> {
        (self.f)(env).await
    }
}

/// Builds an [`Application`] from a closure returning a boxed future.
///
/// ```no_run
/// use micro_httpd::handler::handler_fn;
///
/// let app = handler_fn(|env| {
///     Box::pin(async move {
///         env.response().write(b"hello").await?;
///         Ok(())
///     })
/// });
/// # let _ = app;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a, 'conn> Fn(&'a mut Environment<'conn>) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    HandlerFn { f }
}
