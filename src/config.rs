//! Logger configuration.
//!
//! ```text
//! ASTOR_LOG_LEVEL   debug | info | warn | error   (default: info)
//! ASTOR_LOG_FORMAT  json | tracing                (default: json)
//! ASTOR_LOG_OUTPUT  stdout | stderr               (default: stdout)
//! ```
//!
//! `tracing` hands records to whatever `tracing` subscriber the application
//! installed; `ASTOR_LOG_OUTPUT` and `ASTOR_LOG_LEVEL` then have no effect,
//! the subscriber's own filter decides.

use serde::Deserialize;

use crate::error::Error;
use crate::logger::{Level, Logger};
use crate::sink::{JsonSink, TracingSink};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Tracing,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::Info, format: LogFormat::Json, output: LogOutput::Stdout }
    }
}

impl LogConfig {
    /// Reads the `ASTOR_LOG_*` environment variables. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(v) = lookup("ASTOR_LOG_LEVEL") {
            config.level = v.parse().map_err(|e| Error::config("ASTOR_LOG_LEVEL", e))?;
        }
        if let Some(v) = lookup("ASTOR_LOG_FORMAT") {
            config.format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "tracing" => LogFormat::Tracing,
                _ => return Err(Error::config("ASTOR_LOG_FORMAT", format!("unknown format `{v}`"))),
            };
        }
        if let Some(v) = lookup("ASTOR_LOG_OUTPUT") {
            config.output = match v.to_ascii_lowercase().as_str() {
                "stdout" => LogOutput::Stdout,
                "stderr" => LogOutput::Stderr,
                _ => return Err(Error::config("ASTOR_LOG_OUTPUT", format!("unknown output `{v}`"))),
            };
        }

        Ok(config)
    }

    /// Builds the configured logger.
    pub fn build(&self) -> Logger {
        match (self.format, self.output) {
            (LogFormat::Tracing, _) => Logger::new(TracingSink::new()),
            (LogFormat::Json, LogOutput::Stdout) => {
                Logger::new(JsonSink::new(std::io::stdout()).with_level(self.level))
            }
            (LogFormat::Json, LogOutput::Stderr) => {
                Logger::new(JsonSink::new(std::io::stderr()).with_level(self.level))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = LogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = LogConfig::from_lookup(lookup(&[
            ("ASTOR_LOG_LEVEL", "DEBUG"),
            ("ASTOR_LOG_FORMAT", "tracing"),
            ("ASTOR_LOG_OUTPUT", "stderr"),
        ]))
        .unwrap();

        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.format, LogFormat::Tracing);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn rejects_unknown_values() {
        let err = LogConfig::from_lookup(lookup(&[("ASTOR_LOG_LEVEL", "loud")])).unwrap_err();
        assert!(matches!(err, Error::Config { key: "ASTOR_LOG_LEVEL", .. }));

        let err = LogConfig::from_lookup(lookup(&[("ASTOR_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, Error::Config { key: "ASTOR_LOG_FORMAT", .. }));
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: LogConfig = serde_json::from_str(r#"{"level":"warn"}"#).unwrap();
        assert_eq!(config.level, Level::Warn);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn json_build_respects_level() {
        let log = LogConfig { level: Level::Error, ..LogConfig::default() }.build();
        assert!(!log.enabled(Level::Info));
        assert!(log.enabled(Level::Error));
    }
}
