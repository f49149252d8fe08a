//! Per-request summary logging.
//!
//! [`RequestLogger`] asks its [`LogFormatter`] for a fresh [`LogEntry`] as the
//! request enters, runs the rest of the chain, and reports the outcome to the
//! entry exactly once. The entry is also stored in the request context so
//! [`Recoverer`](super::Recoverer) can report a panic to it first:
//!
//! ```text
//! RequestLogger ── new_log_entry(&req) ─┐
//!   │                                   │ entry stored in the context
//!   ├─ next.run(req) ── Recoverer ── handler panics
//!   │                      └─ entry.panic(value, stack)      → ERROR "panic"
//!   └─ entry.write(status, bytes, …)                         → INFO  "request complete"
//! ```
//!
//! Register it after [`ContextLogger`](super::ContextLogger) (so the entry
//! picks up the request's logger), after [`RealIp`](super::RealIp) if the
//! client address matters, and before [`Recoverer`](super::Recoverer).

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use http::{HeaderMap, Version};

use crate::context::Context;
use crate::handler::BoxFuture;
use crate::logger::{Attr, Level, Logger};
use crate::middleware::logger::get_logger;
use crate::middleware::recoverer::panic_message;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Builds one [`LogEntry`] per request.
pub trait LogFormatter: Send + Sync + 'static {
    fn new_log_entry(&self, req: &Request) -> Box<dyn LogEntry>;
}

/// Receives the outcome of a single request.
pub trait LogEntry: Send + Sync {
    /// Called once, after the response is known.
    fn write(
        &self,
        status: u16,
        bytes: usize,
        headers: &HeaderMap,
        elapsed: Duration,
        extra: Option<&(dyn Any + Send + Sync)>,
    );

    /// Called at most once, before [`write`](Self::write), when the handler
    /// panicked. `stack` is the backtrace text captured by the recoverer.
    fn panic(&self, value: &(dyn Any + Send), stack: &str);
}

// Private type; see `ContextLogger`'s `LoggerKey`.
struct LogEntryKey(Arc<dyn LogEntry>);

/// Returns a child of `ctx` carrying `entry`.
pub fn with_log_entry(ctx: &Context, entry: Arc<dyn LogEntry>) -> Context {
    ctx.with_value(LogEntryKey(entry))
}

/// The log entry for the current request, if a [`RequestLogger`] runs
/// further out in the chain.
pub fn get_log_entry(ctx: &Context) -> Option<Arc<dyn LogEntry>> {
    ctx.value::<LogEntryKey>().map(|k| Arc::clone(&k.0))
}

// ── RequestLogger ─────────────────────────────────────────────────────────────

/// Middleware that reports every request to a [`LogEntry`].
#[derive(Clone)]
pub struct RequestLogger {
    formatter: Arc<dyn LogFormatter>,
}

impl RequestLogger {
    /// Uses [`SummaryFormatter`].
    pub fn new() -> Self {
        Self::with_formatter(SummaryFormatter)
    }

    pub fn with_formatter(formatter: impl LogFormatter) -> Self {
        Self { formatter: Arc::new(formatter) }
    }
}

impl Default for RequestLogger {
    fn default() -> Self { Self::new() }
}

impl Middleware for RequestLogger {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let entry: Arc<dyn LogEntry> = Arc::from(self.formatter.new_log_entry(&req));
        let ctx = with_log_entry(req.context(), Arc::clone(&entry));
        let req = req.with_context(ctx);

        Box::pin(async move {
            let start = Instant::now();
            // `next.run` goes inside the guard; a stage may panic before it
            // returns its future.
            match AssertUnwindSafe(async move { next.run(req).await }).catch_unwind().await {
                Ok(res) => {
                    entry.write(
                        res.status_code().as_u16(),
                        res.body().len(),
                        res.headers(),
                        start.elapsed(),
                        None,
                    );
                    res
                }
                Err(payload) => {
                    // Nothing recovered the panic, so no response exists.
                    entry.write(0, 0, &HeaderMap::new(), start.elapsed(), None);
                    std::panic::resume_unwind(payload)
                }
            }
        })
    }
}

// ── SummaryFormatter / RequestLogEntry ────────────────────────────────────────

/// The default formatter: one `"request complete"` record per request, plus a
/// `"panic"` record when the handler panicked.
#[derive(Clone, Copy, Debug, Default)]
pub struct SummaryFormatter;

impl LogFormatter for SummaryFormatter {
    fn new_log_entry(&self, req: &Request) -> Box<dyn LogEntry> {
        Box::new(RequestLogEntry::new(req))
    }
}

/// Entry produced by [`SummaryFormatter`].
///
/// The request facts are captured at construction and kept apart from the
/// logger, so the panic record carries only the panic and the logger's own
/// attributes (such as `req_id`).
pub struct RequestLogEntry {
    attrs: Vec<Attr>,
    ctx: Context,
    log: Logger,
}

impl RequestLogEntry {
    pub fn new(req: &Request) -> Self {
        let ctx = req.context().clone();
        let log = get_logger(&ctx);

        let scheme = if req.is_tls() { "https" } else { "http" };
        let uri = format!(
            "{scheme}://{}{} {}",
            req.host(),
            req.request_uri(),
            protocol(req.version()),
        );

        Self {
            attrs: vec![
                Attr::string("method", req.method().as_str()),
                Attr::string("remote_addr", req.remote_addr()),
                Attr::string("uri", uri),
            ],
            ctx,
            log,
        }
    }

    /// The request facts captured at construction.
    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }
}

/// Protocol as written on the request line.
fn protocol(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == Version::HTTP_2 {
        "HTTP/2.0"
    } else if version == Version::HTTP_3 {
        "HTTP/3.0"
    } else {
        "HTTP/1.1"
    }
}

impl LogEntry for RequestLogEntry {
    fn write(
        &self,
        status: u16,
        bytes: usize,
        _headers: &HeaderMap,
        elapsed: Duration,
        _extra: Option<&(dyn Any + Send + Sync)>,
    ) {
        if !self.log.enabled(Level::Info) {
            return;
        }
        let mut attrs = self.attrs.clone();
        attrs.extend([
            Attr::float("elapsed_ms", elapsed.as_nanos() as f64 / 1_000_000.0),
            Attr::uint("bytes", bytes as u64),
            Attr::uint("status", u64::from(status)),
        ]);
        self.log.log_ctx(&self.ctx, Level::Info, "request complete", &attrs);
    }

    fn panic(&self, value: &(dyn Any + Send), stack: &str) {
        self.log.log_ctx(
            &self.ctx,
            Level::Error,
            "panic",
            &[
                Attr::string("panic", panic_message(value)),
                Attr::string("stack", stack),
            ],
        );
    }
}
