//! Radix-tree request router with an ordered middleware stack.
//!
//! One tree per HTTP method, O(path-length) lookup. Middleware registered
//! with [`Router::middleware`] runs in registration order around *every*
//! request, before the route is resolved, so stages like request logging also
//! see 404s and 405s.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve)
/// or wrap it in an `Arc` and drive it with [`Router::handle`].
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), middleware: Vec::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Appends a middleware stage. The first registered stage is the
    /// outermost: it sees the request first and the response last.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Runs `req` through the middleware stack and the matching route.
    pub fn handle(self: &Arc<Self>, req: Request) -> BoxFuture {
        Next::new(Arc::clone(self)).run(req)
    }

    /// Innermost stage: route lookup and handler call.
    pub(crate) fn dispatch(&self, mut req: Request) -> BoxFuture {
        let found = self.routes.get(req.method())
            .and_then(|tree| tree.at(req.path()).ok())
            .map(|matched| {
                let params: HashMap<String, String> = matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                (Arc::clone(matched.value), params)
            });

        match found {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req)
            }
            None => {
                let status = self.unmatched_status(req.path());
                Box::pin(async move { Response::status(status) })
            }
        }
    }

    /// 405 if some other method owns the path, else 404.
    fn unmatched_status(&self, path: &str) -> StatusCode {
        if self.routes.values().any(|tree| tree.at(path).is_ok()) {
            StatusCode::METHOD_NOT_ALLOWED
        } else {
            StatusCode::NOT_FOUND
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
