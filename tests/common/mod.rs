use std::io::Write;
use std::sync::{Arc, Mutex};

use astor_reqlog::middleware::{ContextLogger, Recoverer, RequestLogger};
use astor_reqlog::{Handler, JsonSink, Logger, Router};
use serde_json::Value;

/// In-memory writer shared between a `JsonSink` and the test body.
#[derive(Clone, Default)]
pub struct Buf(Arc<Mutex<Vec<u8>>>);

impl Write for Buf {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Buf {
    pub fn logger(&self) -> Logger {
        Logger::new(JsonSink::new(self.clone()))
    }

    /// Every record written so far, parsed.
    pub fn records(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

/// `ContextLogger → RequestLogger → Recoverer`, with `handler` on `GET path`.
pub fn logged_app(buf: &Buf, path: &str, handler: impl Handler) -> Arc<Router> {
    Arc::new(
        Router::new()
            .middleware(ContextLogger::new(buf.logger()))
            .middleware(RequestLogger::new())
            .middleware(Recoverer)
            .get(path, handler),
    )
}
