//! # astor-reqlog
//!
//! Request-scoped structured logging for the astor HTTP framework.
//!
//! Every request gets its own [`Logger`], tagged with the request id, reachable
//! from any handler through the request [`Context`]. When the request
//! finishes, exactly one `"request complete"` record summarizes it; a handler
//! panic adds one `"panic"` record before that.
//!
//! ```text
//! {"time":"…","level":"ERROR","msg":"panic","req_id":"7f3a…","panic":"boom","stack":"…"}
//! {"time":"…","level":"INFO","msg":"request complete","req_id":"7f3a…","method":"GET",
//!  "remote_addr":"10.0.0.7:5555","uri":"http://example.com/42 HTTP/1.1",
//!  "elapsed_ms":0.41,"bytes":0,"status":500}
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use astor_reqlog::middleware::{get_logger, ContextLogger, Recoverer, RequestId, RequestLogger};
//! use astor_reqlog::{Attr, LogConfig, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), astor_reqlog::Error> {
//!     let log = LogConfig::from_env()?.build();
//!
//!     let app = Router::new()
//!         .middleware(RequestId::new())
//!         .middleware(ContextLogger::new(log))
//!         .middleware(RequestLogger::new())
//!         .middleware(Recoverer)
//!         .get("/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     get_logger(req.context()).info("loading user", &[Attr::string("user_id", id)]);
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//! ```
//!
//! Stage order matters; see [`middleware`].

mod config;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod sink;

pub mod logger;
pub mod middleware;

pub use config::{LogConfig, LogFormat, LogOutput};
pub use context::Context;
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use logger::{Attr, Level, LogSink, Logger, Record};
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use sink::{JsonSink, TracingSink};
