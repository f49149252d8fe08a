//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. A stage receives the request and a [`Next`] handle
//! to the rest of the chain; it may rewrite the request, call `next.run(req)`
//! zero or one time, and inspect or rewrite the response.
//!
//! Any `async fn(Request, Next) -> Response` is a middleware:
//!
//! ```rust
//! use astor_reqlog::{Request, Response, Router};
//! use astor_reqlog::middleware::Next;
//!
//! async fn deny_all(_req: Request, _next: Next) -> Response {
//!     Response::status(http::StatusCode::FORBIDDEN)
//! }
//!
//! let app = Router::new().middleware(deny_all);
//! ```
//!
//! # Request logging
//!
//! The built-in stages are meant to be registered in this order:
//!
//! ```rust
//! use astor_reqlog::{JsonSink, Logger, Router};
//! use astor_reqlog::middleware::{ContextLogger, RealIp, Recoverer, RequestId, RequestLogger};
//!
//! let log = Logger::new(JsonSink::new(std::io::stdout()));
//!
//! let app = Router::new()
//!     .middleware(RequestId::new())        // assigns req_id
//!     .middleware(ContextLogger::new(log)) // binds logger (+ req_id) to the context
//!     .middleware(RealIp)                  // optional; must precede RequestLogger
//!     .middleware(RequestLogger::new())    // one "request complete" record per request
//!     .middleware(Recoverer);              // turns panics into 500 + a "panic" record
//! ```
//!
//! Each stage only sees what earlier stages put in the context. A
//! [`RequestId`] registered after [`ContextLogger`] still assigns an id, but
//! that request's logger never carries it.

mod logger;
mod real_ip;
mod recoverer;
mod request_id;
mod request_logger;

use std::future::Future;
use std::sync::Arc;

pub use logger::{ContextLogger, get_logger, with_logger};
pub use real_ip::RealIp;
pub use recoverer::{Recoverer, panic_message};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id, with_request_id};
pub use request_logger::{
    LogEntry, LogFormatter, RequestLogEntry, RequestLogger, SummaryFormatter, get_log_entry,
    with_log_entry,
};

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// One stage of the request pipeline.
///
/// The returned future is `'static`: clone whatever the stage needs out of
/// `&self` before moving it into the future.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self)(req, next))
    }
}

/// The remainder of the middleware chain, ending in the router.
pub struct Next {
    router: Arc<Router>,
    index: usize,
}

impl Next {
    pub(crate) fn new(router: Arc<Router>) -> Self {
        Self { router, index: 0 }
    }

    /// Passes `req` to the next stage, or to the route handler if this was
    /// the last one.
    pub fn run(self, req: Request) -> BoxFuture {
        let stage = self.router.middleware.get(self.index).cloned();
        match stage {
            Some(stage) => stage.call(req, Next { router: self.router, index: self.index + 1 }),
            None => self.router.dispatch(req),
        }
    }
}
