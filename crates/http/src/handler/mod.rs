//! The seam between a connection and whatever dispatches requests.
//!
//! A [`Handler`] is consulted twice per connection: [`Handler::route`] right after the
//! request line, before any header or body is collected, and [`Handler::call`] once the
//! full request is available. Splitting the two lets routing misses be answered without
//! building a request at all.

use crate::protocol::{HandlerError, Method, Request, Response};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;

#[async_trait]
pub trait Handler: Send + Sync {
    /// Whatever `route` resolved, carried over to `call`.
    type Route: Send;

    /// Resolves the target of a request line. `path` is the request target before `?`,
    /// still percent-encoded. A miss is returned as the response to send back.
    fn route(&self, method: Method, path: &str) -> Result<Self::Route, Response>;

    async fn call(&self, route: Self::Route, request: Request) -> Result<Response, HandlerError>;
}

/// A [`Handler`] that accepts every request line and hands the request to one function.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HandlerError>> + Send,
{
    type Route = ();

    fn route(&self, _method: Method, _path: &str) -> Result<Self::Route, Response> {
        Ok(())
    }

    async fn call(&self, _route: Self::Route, request: Request) -> Result<Response, HandlerError> {
        (self.f)(request).await
    }
}

pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HandlerError>> + Send,
{
    HandlerFn { f }
}
