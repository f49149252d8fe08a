//! Built-in [`LogSink`] implementations.
//!
//! - [`JsonSink`]: newline-delimited JSON to any `io::Write`.
//! - [`TracingSink`]: forwards records to the `tracing` ecosystem.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::logger::{Level, LogSink, Record};

/// Renders the attributes of `record` into one JSON object. Later keys
/// overwrite earlier ones, so call-site attributes beat logger attributes.
fn attrs_object(record: &Record<'_>) -> Map<String, Value> {
    let mut map = Map::new();
    for attr in record.all_attrs() {
        map.insert(attr.key.clone().into_owned(), attr.value.clone());
    }
    map
}

// ── JsonSink ──────────────────────────────────────────────────────────────────

/// Writes one JSON object per record, each followed by `\n`:
///
/// ```text
/// {"time":"2024-05-01T10:00:00.000Z","level":"INFO","msg":"request complete","method":"GET",…}
/// ```
///
/// `time`, `level` and `msg` always come first, in that order. Attributes
/// follow in emission order. Records below the configured level (default
/// [`Level::Info`]) are dropped before they are rendered.
pub struct JsonSink<W> {
    writer: Mutex<W>,
    level: Level,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer), level: Level::Info }
    }

    /// Sets the minimum level that is written.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl<W: Write + Send> LogSink for JsonSink<W> {
    fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    fn emit(&self, record: &Record<'_>) {
        let mut obj = Map::new();
        obj.insert(
            "time".into(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        obj.insert("level".into(), record.level.as_str().into());
        obj.insert("msg".into(), record.msg.into());
        for (k, v) in attrs_object(record) {
            // `time`/`level`/`msg` are reserved; an attribute cannot clobber them.
            obj.entry(k).or_insert(v);
        }

        let mut line = match serde_json::to_vec(&Value::Object(obj)) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unserializable log record");
                return;
            }
        };
        line.push(b'\n');

        // One write_all per record keeps lines whole across threads. A panic
        // in another writer must not silence logging for everyone else.
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.write_all(&line).and_then(|()| writer.flush()) {
            tracing::warn!(error = %e, "failed to write log record");
        }
    }
}

// ── TracingSink ───────────────────────────────────────────────────────────────

/// Forwards records as `tracing` events under the `astor_reqlog` target.
///
/// `tracing` field names are static, so the record's attributes travel as one
/// JSON-encoded `attrs` field.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Debug => tracing::enabled!(target: "astor_reqlog", tracing::Level::DEBUG),
            Level::Info  => tracing::enabled!(target: "astor_reqlog", tracing::Level::INFO),
            Level::Warn  => tracing::enabled!(target: "astor_reqlog", tracing::Level::WARN),
            Level::Error => tracing::enabled!(target: "astor_reqlog", tracing::Level::ERROR),
        }
    }

    fn emit(&self, record: &Record<'_>) {
        let attrs = Value::Object(attrs_object(record));
        let msg = record.msg;
        match record.level {
            Level::Debug => tracing::debug!(target: "astor_reqlog", %attrs, "{msg}"),
            Level::Info  => tracing::info!(target: "astor_reqlog", %attrs, "{msg}"),
            Level::Warn  => tracing::warn!(target: "astor_reqlog", %attrs, "{msg}"),
            Level::Error => tracing::error!(target: "astor_reqlog", %attrs, "{msg}"),
        }
    }
}
