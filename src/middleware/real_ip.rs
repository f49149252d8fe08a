//! Client address normalization behind a reverse proxy.
//!
//! Behind nginx the TCP peer is the proxy. [`RealIp`] replaces the request's
//! `remote_addr` with the client address the proxy forwarded, checking, in
//! order:
//!
//! 1. `True-Client-IP`
//! 2. `X-Real-IP`
//! 3. the first entry of `X-Forwarded-For`
//!
//! Values that do not parse as an IP address are ignored. Only deploy this
//! where the proxy overwrites these headers; a directly exposed server would
//! let clients pick their own address.
//!
//! [`RequestLogger`](super::RequestLogger) captures `remote_addr` when the
//! request reaches it, so `RealIp` must be registered before it.

use std::net::IpAddr;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

#[derive(Clone, Copy, Debug, Default)]
pub struct RealIp;

impl Middleware for RealIp {
    fn call(&self, mut req: Request, next: Next) -> BoxFuture {
        if let Some(ip) = real_ip(&req) {
            req.set_remote_addr(ip.to_string());
        }
        next.run(req)
    }
}

fn real_ip(req: &Request) -> Option<IpAddr> {
    let candidate = req
        .header("true-client-ip")
        .or_else(|| req.header("x-real-ip"))
        .or_else(|| req.header("x-forwarded-for").and_then(|v| v.split(',').next()))?;
    candidate.trim().parse().ok()
}
