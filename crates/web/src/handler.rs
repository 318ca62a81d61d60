//! Request handlers registered in the route table.
//!
//! A [`RequestHandler`] receives the full [`Request`], path parameters included, and returns
//! a [`Response`] or a [`HandlerError`]. Plain async functions become handlers through
//! [`handler_fn`] as long as their output is a [`Responder`].

use crate::responder::Responder;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use switchyard_http::protocol::{HandlerError, Request, Response};

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, request: Request) -> Result<Response, HandlerError>;
}

#[async_trait]
impl<H> RequestHandler for Arc<H>
where
    H: RequestHandler + ?Sized,
{
    async fn invoke(&self, request: Request) -> Result<Response, HandlerError> {
        self.as_ref().invoke(request).await
    }
}

/// An async function from [`Request`] to a [`Responder`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future + Send,
    Fut::Output: Responder,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future + Send,
    Fut::Output: Responder,
{
    async fn invoke(&self, request: Request) -> Result<Response, HandlerError> {
        (self.f)(request).await.into_response()
    }
}
