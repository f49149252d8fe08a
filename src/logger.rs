//! Structured logger handle.
//!
//! A [`Logger`] is a cheap, cloneable handle: a shared [`LogSink`] plus an
//! immutable list of attributes that every record emitted through the handle
//! carries. [`Logger::with`] derives a new handle with extra attributes; the
//! original is never affected, so a base logger can be shared by every
//! concurrent request without locks.
//!
//! ```rust
//! use astor_reqlog::{Attr, JsonSink, Logger};
//!
//! let base = Logger::new(JsonSink::new(std::io::stdout()));
//! let scoped = base.with([Attr::string("req_id", "7f3a")]);
//!
//! scoped.info("user loaded", &[Attr::int("user_id", 42)]);
//! // {"time":"…","level":"INFO","msg":"user loaded","req_id":"7f3a","user_id":42}
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use serde::Deserialize;
use serde_json::Value;

use crate::context::Context;
use crate::sink::TracingSink;

// ── Level ─────────────────────────────────────────────────────────────────────

/// Record severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Uppercase wire representation (`"INFO"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info  => "INFO",
            Self::Warn  => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Case-insensitive: `info`, `INFO` and `Info` all parse.
impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug"            => Ok(Self::Debug),
            "info"             => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error"            => Ok(Self::Error),
            _                  => Err(format!("unknown level `{s}`")),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Attr ──────────────────────────────────────────────────────────────────────

/// One key/value pair attached to a record.
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn string(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(key, Value::String(value.into()))
    }

    pub fn int(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self::new(key, value)
    }

    pub fn uint(key: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Self::new(key, value)
    }

    /// Non-finite floats have no JSON representation and become `null`.
    pub fn float(key: impl Into<Cow<'static, str>>, value: f64) -> Self {
        Self::new(key, value)
    }

    pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Self::new(key, value)
    }
}

// ── Record / LogSink ──────────────────────────────────────────────────────────

/// A single log event as handed to a [`LogSink`].
#[derive(Debug)]
pub struct Record<'a> {
    pub level: Level,
    pub msg: &'a str,
    /// Attributes carried by the emitting [`Logger`], oldest first.
    pub logger_attrs: &'a [Attr],
    /// Attributes passed at the call site. They win over `logger_attrs` on
    /// key collisions.
    pub attrs: &'a [Attr],
    /// The request context the record was emitted under, if any.
    pub context: Option<&'a Context>,
}

impl Record<'_> {
    /// All attributes in emission order: logger attributes, then call-site ones.
    pub fn all_attrs(&self) -> impl Iterator<Item = &Attr> {
        self.logger_attrs.iter().chain(self.attrs)
    }
}

/// Destination for records. Implementations must be safe to call from any
/// number of request tasks at once.
pub trait LogSink: Send + Sync {
    /// Cheap pre-check so disabled records are never assembled.
    fn enabled(&self, _level: Level) -> bool {
        true
    }

    /// Writes one record. Must not panic; failures are the sink's to swallow.
    fn emit(&self, record: &Record<'_>);
}

// ── Logger ────────────────────────────────────────────────────────────────────

/// Shared, immutable structured-logging handle.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    attrs: Arc<[Attr]>,
}

impl Logger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self::from_sink(Arc::new(sink))
    }

    pub fn from_sink(sink: Arc<dyn LogSink>) -> Self {
        Self { sink, attrs: Arc::from(Vec::new()) }
    }

    /// Returns a new handle carrying `attrs` in addition to this one's.
    /// Both handles write to the same sink.
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        let merged: Vec<Attr> = self.attrs.iter().cloned().chain(attrs).collect();
        Self { sink: Arc::clone(&self.sink), attrs: Arc::from(merged) }
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.sink.enabled(level)
    }

    pub fn log(&self, level: Level, msg: &str, attrs: &[Attr]) {
        self.emit(None, level, msg, attrs);
    }

    /// Like [`log`](Self::log), but hands `ctx` to the sink alongside the record.
    pub fn log_ctx(&self, ctx: &Context, level: Level, msg: &str, attrs: &[Attr]) {
        self.emit(Some(ctx), level, msg, attrs);
    }

    pub fn debug(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::Debug, msg, attrs);
    }

    pub fn info(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::Info, msg, attrs);
    }

    pub fn warn(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::Warn, msg, attrs);
    }

    pub fn error(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::Error, msg, attrs);
    }

    /// True if both handles share the same sink and the same attribute list,
    /// i.e. one is a clone of the other.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.sink), Arc::as_ptr(&other.sink))
            && Arc::ptr_eq(&self.attrs, &other.attrs)
    }

    fn emit(&self, context: Option<&Context>, level: Level, msg: &str, attrs: &[Attr]) {
        if !self.sink.enabled(level) {
            return;
        }
        self.sink.emit(&Record {
            level,
            msg,
            logger_attrs: &self.attrs,
            attrs,
            context,
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("attrs", &self.attrs).finish_non_exhaustive()
    }
}

// ── Process-wide default ──────────────────────────────────────────────────────

static DEFAULT: LazyLock<ArcSwap<Logger>> =
    LazyLock::new(|| ArcSwap::from_pointee(Logger::new(TracingSink::new())));

/// The process-wide default logger.
///
/// Until [`set_default`] is called this forwards to `tracing`, so records land
/// wherever the application's subscriber sends them.
pub fn default() -> Logger {
    Logger::clone(&DEFAULT.load())
}

/// Replaces the process-wide default logger.
pub fn set_default(logger: Logger) {
    DEFAULT.store(Arc::new(logger));
}
