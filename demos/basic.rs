//! Request logging demo: JSON endpoints, a panicking route, and one summary
//! record per request on stdout.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'x-request-id: demo-1' http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/boom
//!
//! `ASTOR_LOG_LEVEL`, `ASTOR_LOG_FORMAT` and `ASTOR_LOG_OUTPUT` configure the
//! request logger; `RUST_LOG` filters the server's own lifecycle logs.

use astor_reqlog::middleware::{
    get_logger, ContextLogger, RealIp, Recoverer, RequestId, RequestLogger,
};
use astor_reqlog::{logger, Attr, LogConfig, Request, Response, Router, Server};
use http::StatusCode;

#[tokio::main]
async fn main() -> Result<(), astor_reqlog::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let log = LogConfig::from_env()?.build();
    logger::set_default(log.clone());

    let app = Router::new()
        .middleware(RequestId::new())
        .middleware(ContextLogger::new(log))
        .middleware(RealIp)
        .middleware(RequestLogger::new())
        .middleware(Recoverer)
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .get("/boom", boom);

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    get_logger(req.context()).info("loading user", &[Attr::string("user_id", id)]);
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        get_logger(req.context()).warn("empty body", &[]);
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// GET /boom → ERROR "panic" record, then 500
async fn boom(_req: Request) -> Response {
    panic!("boom");
}
