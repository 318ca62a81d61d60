//! The route table.
//!
//! Routes are kept per method in registration order. Resolving `(method, path)` walks the
//! routes of that method and the first pattern that matches wins; when none does, the other
//! methods are consulted only to tell a `405` apart from a `404`.
//!
//! ```
//! use switchyard_web::router::{Router, RouteResolution, get};
//! use switchyard_web::handler_fn;
//! use switchyard_http::protocol::{Method, Request};
//!
//! async fn user(request: Request) -> String {
//!     format!("user {}", request.path_param("id").unwrap_or_default())
//! }
//!
//! let router = Router::builder().route("/users/:id", get(handler_fn(user))).build().unwrap();
//! assert!(matches!(router.resolve(Method::Get, "/users/42"), RouteResolution::Matched(_)));
//! assert!(matches!(router.resolve(Method::Post, "/users/42"), RouteResolution::MethodNotAllowed { .. }));
//! assert!(matches!(router.resolve(Method::Get, "/teams/42"), RouteResolution::NotFound));
//! ```

mod error;
mod pattern;

pub use error::RouteError;
pub use pattern::RoutePattern;

use pattern::decode_segments;

use crate::files::StaticFiles;
use crate::handler::RequestHandler;
use crate::sse::{SseEndpoint, SseHandler};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use switchyard_http::protocol::{Method, PathParams};
use tracing::debug;

/// An immutable route table, built once by [`RouterBuilder`] and shared by every connection.
pub struct Router {
    routes: [Vec<Route>; Method::COUNT],
}

pub struct Route {
    pattern: RoutePattern,
    handler: Arc<dyn RequestHandler>,
}

/// The outcome of [`Router::resolve`].
#[derive(Debug)]
pub enum RouteResolution {
    Matched(RouteMatch),
    /// The path matches, but only under other methods, listed here.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// A matched route: its handler and the parameters bound from the path.
pub struct RouteMatch {
    handler: Arc<dyn RequestHandler>,
    params: PathParams,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Resolves a raw request path, as received. Segments are percent-decoded before
    /// matching, so `/h%65llo` reaches a `/hello` route.
    pub fn resolve(&self, method: Method, path: &str) -> RouteResolution {
        let decoded = decode_segments(path);
        let path: &str = &decoded;
        let matched = self.routes[method.index()]
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| RouteMatch { handler: Arc::clone(&route.handler), params }));

        if let Some(matched) = matched {
            return RouteResolution::Matched(matched);
        }

        let allowed = Method::ALL
            .iter()
            .copied()
            .filter(|other| *other != method && self.routes[other.index()].iter().any(|route| route.pattern.is_match(path)))
            .collect::<Vec<_>>();

        if allowed.is_empty() { RouteResolution::NotFound } else { RouteResolution::MethodNotAllowed { allowed } }
    }

    /// Routes of one method, in matching order.
    pub fn routes(&self, method: Method) -> &[Route] {
        &self.routes[method.index()]
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for method in Method::ALL {
            let templates = self.routes(method).iter().map(Route::template).collect::<Vec<_>>();
            if !templates.is_empty() {
                map.entry(&method, &templates);
            }
        }
        map.finish()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("pattern", &self.pattern).finish_non_exhaustive()
    }
}

impl Route {
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch").field("params", &self.params).finish_non_exhaustive()
    }
}

impl RouteMatch {
    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_parts(self) -> (Arc<dyn RequestHandler>, PathParams) {
        (self.handler, self.params)
    }
}

/// A handler bound to one method, see [`get`], [`post`] and friends.
pub struct MethodRoute {
    method: Method,
    handler: Arc<dyn RequestHandler>,
}

impl fmt::Debug for MethodRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRoute").field("method", &self.method).finish_non_exhaustive()
    }
}

impl MethodRoute {
    pub fn new<H: RequestHandler + 'static>(method: Method, handler: H) -> Self {
        Self { method, handler: Arc::new(handler) }
    }
}

macro_rules! method_route {
    ($fn_name:ident, $method:ident) => {
        pub fn $fn_name<H: RequestHandler + 'static>(handler: H) -> MethodRoute {
            MethodRoute::new(Method::$method, handler)
        }
    };
}

method_route!(get, Get);
method_route!(post, Post);
method_route!(put, Put);
method_route!(delete, Delete);
method_route!(head, Head);
method_route!(options, Options);
method_route!(connect, Connect);
method_route!(patch, Patch);
method_route!(trace, Trace);

/// Collects registrations; templates are compiled and checked in [`RouterBuilder::build`].
#[derive(Debug, Default)]
pub struct RouterBuilder {
    registrations: Vec<(String, MethodRoute)>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, template: impl Into<String>, route: MethodRoute) -> Self {
        self.registrations.push((template.into(), route));
        self
    }

    pub fn register<H: RequestHandler + 'static>(self, method: Method, template: impl Into<String>, handler: H) -> Self {
        self.route(template, MethodRoute::new(method, handler))
    }

    /// Serves the files under `root` at `prefix/*path`. The route is registered for every
    /// method so that anything but `GET` gets a `501` from the file handler rather than a `405`.
    pub fn files(mut self, prefix: &str, root: impl Into<PathBuf>) -> Self {
        let template = format!("{}/*{}", prefix.trim_end_matches('/'), StaticFiles::PATH_PARAM);
        let handler: Arc<dyn RequestHandler> = Arc::new(StaticFiles::new(root));
        for method in Method::ALL {
            self.registrations.push((template.clone(), MethodRoute { method, handler: Arc::clone(&handler) }));
        }
        self
    }

    /// Serves `endpoint` as an event stream on `GET template`.
    pub fn sse(self, template: impl Into<String>, endpoint: &Arc<SseEndpoint>) -> Self {
        self.route(template, get(SseHandler::new(Arc::clone(endpoint))))
    }

    pub fn build(self) -> Result<Router, RouteError> {
        let mut routes: [Vec<Route>; Method::COUNT] = std::array::from_fn(|_| Vec::new());

        for (template, MethodRoute { method, handler }) in self.registrations {
            let method_routes = &mut routes[method.index()];
            if method_routes.iter().any(|route| route.template().eq_ignore_ascii_case(&template)) {
                return Err(RouteError::duplicate_route(method, &template));
            }

            let pattern = RoutePattern::compile(&template)?;
            debug!(%method, template = pattern.template(), params = ?pattern.params(), "route registered");
            method_routes.push(Route { pattern, handler });
        }

        Ok(Router { routes })
    }
}
