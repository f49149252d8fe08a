//! Request-id assignment.
//!
//! Every request gets an identifier before anything logs about it. An id
//! supplied by the caller (or an upstream proxy) in `X-Request-Id` is kept;
//! otherwise a UUID v4 is generated. The id is stored in the request
//! [`Context`] and echoed back in the response header.

use http::HeaderValue;
use uuid::Uuid;

use crate::context::Context;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

struct RequestIdKey(String);

/// Middleware that assigns a request id. Register it before
/// [`ContextLogger`](super::ContextLogger).
#[derive(Clone, Debug)]
pub struct RequestId {
    header: &'static str,
}

impl RequestId {
    pub fn new() -> Self {
        Self { header: REQUEST_ID_HEADER }
    }

    /// Reads the inbound id from `header` instead of `X-Request-Id`.
    pub fn with_header(header: &'static str) -> Self {
        Self { header }
    }
}

impl Default for RequestId {
    fn default() -> Self { Self::new() }
}

impl Middleware for RequestId {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let id = req
            .header(self.header)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let ctx = with_request_id(req.context(), id.clone());
        let req = req.with_context(ctx);

        Box::pin(async move {
            let mut res = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(&id) {
                res.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            res
        })
    }
}

/// Returns a child of `ctx` carrying `id` as the request id.
pub fn with_request_id(ctx: &Context, id: impl Into<String>) -> Context {
    ctx.with_value(RequestIdKey(id.into()))
}

/// The request id stored in `ctx`, or `""` if none was assigned.
pub fn request_id(ctx: &Context) -> &str {
    ctx.value::<RequestIdKey>().map_or("", |k| k.0.as_str())
}
