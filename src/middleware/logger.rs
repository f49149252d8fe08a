//! Binds a [`Logger`] to each request's context.
//!
//! [`ContextLogger`] must run after [`RequestId`](super::RequestId) and
//! before anything that logs. Handlers and later stages fetch the logger
//! with [`get_logger`].

use crate::context::Context;
use crate::handler::BoxFuture;
use crate::logger::{self, Attr, Logger};
use crate::middleware::request_id::request_id;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

// Private type, so only this module can store or replace the bound logger.
struct LoggerKey(Logger);

/// Middleware that stores a per-request logger in the request context.
///
/// If the context already carries a request id, the stored logger is `base`
/// with `req_id` attached; otherwise it is `base` itself.
#[derive(Clone, Debug)]
pub struct ContextLogger {
    base: Logger,
}

impl ContextLogger {
    pub fn new(base: Logger) -> Self {
        Self { base }
    }
}

impl Middleware for ContextLogger {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let log = match request_id(req.context()) {
            "" => self.base.clone(),
            id => self.base.with([Attr::string("req_id", id)]),
        };
        let ctx = with_logger(req.context(), log);
        next.run(req.with_context(ctx))
    }
}

/// Returns a child of `ctx` carrying `log`.
pub fn with_logger(ctx: &Context, log: Logger) -> Context {
    ctx.with_value(LoggerKey(log))
}

/// The logger bound to `ctx`, or the process-wide [`logger::default`] if none
/// was bound.
pub fn get_logger(ctx: &Context) -> Logger {
    match ctx.value::<LoggerKey>() {
        Some(LoggerKey(log)) => log.clone(),
        None => logger::default(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use serde_json::Value;

    use super::*;
    use crate::middleware::RequestId;
    use crate::{JsonSink, Router};

    #[derive(Clone, Default)]
    struct Buf(Arc<Mutex<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(data)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buf {
        fn first(&self) -> Value {
            let bytes = self.0.lock().unwrap().clone();
            let text = String::from_utf8(bytes).unwrap();
            serde_json::from_str(text.lines().next().unwrap()).unwrap()
        }
    }

    #[tokio::test]
    async fn handler_logs_through_the_bound_logger() {
        let buf = Buf::default();
        let log = Logger::new(JsonSink::new(buf.clone()));

        let app = Arc::new(
            Router::new()
                .middleware(ContextLogger::new(log))
                .get("/", |req: Request| async move {
                    get_logger(req.context()).info("from handler", &[]);
                    ""
                }),
        );
        let res = app.handle(Request::builder().build()).await;

        assert_eq!(res.status_code(), http::StatusCode::OK);
        let line = buf.first();
        assert_eq!(line["msg"], "from handler");
        assert!(line.get("req_id").is_none());
    }

    #[tokio::test]
    async fn request_id_is_attached_when_assigned_first() {
        let buf = Buf::default();
        let log = Logger::new(JsonSink::new(buf.clone()));

        let app = Arc::new(
            Router::new()
                .middleware(RequestId::new())
                .middleware(ContextLogger::new(log))
                .get("/", |req: Request| async move {
                    get_logger(req.context()).info("", &[]);
                    request_id(req.context()).to_owned()
                }),
        );
        let res = app.handle(Request::builder().build()).await;

        let id = std::str::from_utf8(res.body()).unwrap();
        assert!(!id.is_empty());
        assert_eq!(buf.first()["req_id"], id);
    }

    #[tokio::test]
    async fn request_id_assigned_later_is_not_attached() {
        let buf = Buf::default();
        let log = Logger::new(JsonSink::new(buf.clone()));

        let app = Arc::new(
            Router::new()
                .middleware(ContextLogger::new(log))
                .middleware(RequestId::new())
                .get("/", |req: Request| async move {
                    get_logger(req.context()).info("", &[]);
                    ""
                }),
        );
        app.handle(Request::builder().build()).await;

        assert!(buf.first().get("req_id").is_none());
    }

    #[test]
    fn returns_the_stored_logger() {
        let log = Logger::new(JsonSink::new(std::io::sink()));
        let ctx = with_logger(&Context::new(), log.clone());

        assert!(get_logger(&ctx).ptr_eq(&log));
    }

    #[test]
    fn falls_back_to_the_default_logger() {
        let log = Logger::new(JsonSink::new(std::io::sink()));
        logger::set_default(log.clone());

        assert!(get_logger(&Context::new()).ptr_eq(&log));
    }
}
