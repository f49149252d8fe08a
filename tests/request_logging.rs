mod common;

use std::future::Future;
use std::sync::Arc;

use astor_reqlog::middleware::{
    get_logger, ContextLogger, RealIp, Recoverer, RequestId, RequestLogger,
};
use astor_reqlog::{Request, Router};
use common::{logged_app, Buf};
use http::StatusCode;

async fn empty(_req: Request) -> &'static str {
    ""
}

#[tokio::test]
async fn summarizes_plain_http_request() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/42", empty);

    let res = app.handle(Request::builder().uri("/42").build()).await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let records = buf.records();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r["level"], "INFO");
    assert_eq!(r["msg"], "request complete");
    assert_eq!(r["method"], "GET");
    assert_eq!(r["uri"], "http://example.com/42 HTTP/1.1");
    assert_eq!(r["remote_addr"], "192.0.2.1:1234");
    assert_eq!(r["bytes"], 0);
    assert_eq!(r["status"], 200);
    assert!(r["elapsed_ms"].as_f64().is_some_and(|ms| ms >= 0.0));
    assert!(r.get("req_id").is_none());
}

#[tokio::test]
async fn tls_request_uses_https_scheme() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/42", empty);

    app.handle(Request::builder().uri("/42").tls(true).build()).await;

    assert_eq!(buf.records()[0]["uri"], "https://example.com/42 HTTP/1.1");
}

#[tokio::test]
async fn byte_count_is_body_length() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/hello", |_req: Request| async { "hello world" });

    app.handle(Request::builder().uri("/hello").build()).await;

    assert_eq!(buf.records()[0]["bytes"], 11);
}

#[tokio::test]
async fn recovered_panic_logs_panic_then_summary() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/", |_req: Request| async {
        if true {
            panic!("boom");
        }
        ""
    });

    let res = app.handle(Request::builder().build()).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let records = buf.records();
    assert_eq!(records.len(), 2);

    let panic = &records[0];
    assert_eq!(panic["level"], "ERROR");
    assert_eq!(panic["msg"], "panic");
    assert_eq!(panic["panic"], "boom");
    assert!(!panic["stack"].as_str().unwrap().is_empty());
    assert!(panic.get("method").is_none());
    assert!(panic.get("status").is_none());

    let summary = &records[1];
    assert_eq!(summary["level"], "INFO");
    assert_eq!(summary["msg"], "request complete");
    assert_eq!(summary["method"], "GET");
    assert_eq!(summary["uri"], "http://example.com/ HTTP/1.1");
    assert_eq!(summary["bytes"], 0);
    assert_eq!(summary["status"], 500);
    assert!(summary.get("panic").is_none());
}

#[tokio::test]
async fn unrecovered_panic_is_still_summarized_once() {
    let buf = Buf::default();
    let app = Arc::new(
        Router::new()
            .middleware(ContextLogger::new(buf.logger()))
            .middleware(RequestLogger::new())
            .get("/", |_req: Request| async {
                if true {
                    panic!("nobody catches this");
                }
                ""
            }),
    );

    let joined = tokio::spawn(app.handle(Request::builder().build())).await;
    assert!(joined.unwrap_err().is_panic());

    let records = buf.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["msg"], "request complete");
    assert_eq!(records[0]["status"], 0);
}

#[tokio::test]
async fn request_id_flows_into_every_record() {
    let buf = Buf::default();
    let app = Arc::new(
        Router::new()
            .middleware(RequestId::new())
            .middleware(ContextLogger::new(buf.logger()))
            .middleware(RequestLogger::new())
            .middleware(Recoverer)
            .get("/", |req: Request| async move {
                get_logger(req.context()).info("handling", &[]);
                ""
            }),
    );

    let req = Request::builder().header("x-request-id", "req-77").build();
    app.handle(req).await;

    let records = buf.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["msg"], "handling");
    assert_eq!(records[0]["req_id"], "req-77");
    assert_eq!(records[1]["msg"], "request complete");
    assert_eq!(records[1]["req_id"], "req-77");
}

#[tokio::test]
async fn summary_is_the_last_record_of_a_request() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/", |req: Request| async move {
        let log = get_logger(req.context());
        log.info("one", &[]);
        log.info("two", &[]);
        ""
    });

    app.handle(Request::builder().build()).await;

    let msgs: Vec<String> = buf
        .records()
        .iter()
        .map(|r| r["msg"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(msgs, ["one", "two", "request complete"]);
}

#[tokio::test]
async fn unmatched_routes_are_summarized() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/42", empty);

    let res = app.handle(Request::builder().uri("/missing").build()).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let records = buf.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], 404);
}

#[tokio::test]
async fn real_ip_only_counts_when_registered_before_the_summary() {
    let before = Buf::default();
    let app = Arc::new(
        Router::new()
            .middleware(ContextLogger::new(before.logger()))
            .middleware(RealIp)
            .middleware(RequestLogger::new())
            .get("/", empty),
    );
    let req = Request::builder().header("x-forwarded-for", "203.0.113.9").build();
    app.handle(req).await;
    assert_eq!(before.records()[0]["remote_addr"], "203.0.113.9");

    let after = Buf::default();
    let app = Arc::new(
        Router::new()
            .middleware(ContextLogger::new(after.logger()))
            .middleware(RequestLogger::new())
            .middleware(RealIp)
            .get("/", empty),
    );
    let req = Request::builder().header("x-forwarded-for", "203.0.113.9").build();
    app.handle(req).await;
    assert_eq!(after.records()[0]["remote_addr"], "192.0.2.1:1234");
}

#[tokio::test]
async fn concurrent_requests_keep_their_own_ids() {
    let buf = Buf::default();
    let app = Arc::new(
        Router::new()
            .middleware(RequestId::new())
            .middleware(ContextLogger::new(buf.logger()))
            .middleware(RequestLogger::new())
            .get("/{n}", empty),
    );

    let mut tasks = tokio::task::JoinSet::new();
    for n in 0..16 {
        let req = Request::builder()
            .uri(&format!("/{n}"))
            .header("x-request-id", &format!("id-{n}"))
            .build();
        tasks.spawn(app.handle(req));
    }
    while let Some(res) = tasks.join_next().await {
        assert_eq!(res.unwrap().status_code(), StatusCode::OK);
    }

    let records = buf.records();
    assert_eq!(records.len(), 16);
    for r in &records {
        let n = r["uri"]
            .as_str()
            .unwrap()
            .trim_start_matches("http://example.com/")
            .trim_end_matches(" HTTP/1.1");
        assert_eq!(r["req_id"], format!("id-{n}"));
    }
}

fn parse_id_eagerly(req: Request) -> impl Future<Output = &'static str> {
    let _id: u32 = req.param("id").unwrap_or("x").parse().unwrap();
    async { "" }
}

#[tokio::test]
async fn handler_panicking_before_its_future_is_recovered() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/items/{id}", parse_id_eagerly);

    let res = app.handle(Request::builder().uri("/items/abc").build()).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let records = buf.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["msg"], "panic");
    assert!(records[0]["panic"].as_str().unwrap().contains("ParseIntError"));
    assert_eq!(records[1]["msg"], "request complete");
    assert_eq!(records[1]["status"], 500);
}

#[inline(never)]
fn fail_deep_in_handler() -> &'static str {
    panic!("boom");
}

#[tokio::test]
async fn panic_stack_names_the_panicking_function() {
    let buf = Buf::default();
    let app = logged_app(&buf, "/", |_req: Request| async { fail_deep_in_handler() });

    app.handle(Request::builder().build()).await;

    let stack = buf.records()[0]["stack"].as_str().unwrap().to_owned();
    assert!(stack.starts_with("panicked at "), "{stack}");
    assert!(stack.contains("request_logging.rs"), "{stack}");
    assert!(stack.contains("fail_deep_in_handler"), "{stack}");
}
