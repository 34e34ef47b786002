//! Log setup for the flashpack binaries.
//!
//! The level comes from `--log-level` or `FLASHPACK_LOG_LEVEL`. A `json:`
//! prefix (or plain `json`) switches from `env_logger` text lines on stderr
//! to JSON lines, appended to `FLASHPACK_LOG_PATH` when that is set.

use chrono::{Local, SecondsFormat, Utc};
use log::{LevelFilter, Log, Metadata, Record};
use serde_json::json;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::Mutex;

use crate::firmware::defaults::{LOG_LEVEL_ENV, LOG_PATH_ENV};

// Diagnostic lines go to stdout, keep the log quiet by default
const DEFAULT_LEVEL: &str = "warn";

/// How log records are written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// `env_logger` text lines on stderr
    Text,
    /// JSON lines on stderr or `FLASHPACK_LOG_PATH`
    Json,
}

/// Split a level spec such as `debug`, `json` or `json:trace`.
/// Unknown levels fall back to `info`.
pub fn parse_level_spec(spec: &str) -> (LogFormat, LevelFilter) {
    let spec = spec.trim().to_ascii_lowercase();
    let (format, level) = if spec == "json" {
        (LogFormat::Json, "info")
    } else if let Some(level) = spec.strip_prefix("json:") {
        (LogFormat::Json, level)
    } else {
        (LogFormat::Text, spec.as_str())
    };

    (format, level.parse().unwrap_or(LevelFilter::Info))
}

/// JSON-lines logger
#[derive(Debug)]
pub struct JsonLogger {
    level: LevelFilter,
    file: Mutex<Option<File>>,
}

impl JsonLogger {
    /// Log to `log_path` when it can be opened for appending, stderr otherwise
    pub fn new(level: LevelFilter, log_path: Option<&str>) -> Self {
        let file = log_path
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());

        JsonLogger {
            level,
            file: Mutex::new(file),
        }
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.write_all(line.as_bytes());
                return;
            }
        }
        let _ = io::stderr().write_all(line.as_bytes());
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = json!({
            "@timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            "@level": record.level().as_str().to_lowercase(),
            "@message": record.args().to_string(),
            "@module": record.target(),
            "@pid": std::process::id(),
            "@file": record.file().unwrap_or("unknown"),
            "@line": record.line().unwrap_or(0),
        });
        self.write_line(&format!("{entry}\n"));
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
        let _ = io::stderr().flush();
    }
}

/// Install the global logger. `level_spec` (from `--log-level`) wins over
/// `FLASHPACK_LOG_LEVEL`. Returns the effective format and level.
pub fn init(level_spec: Option<&str>) -> (LogFormat, LevelFilter) {
    let spec = level_spec
        .map(str::to_string)
        .or_else(|| env::var(LOG_LEVEL_ENV).ok())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());
    let (format, level) = parse_level_spec(&spec);

    match format {
        LogFormat::Text => {
            let _ = env_logger::Builder::new()
                .filter_level(level)
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "[{} {} {}] {}",
                        Local::now().format("%Y-%m-%dT%H:%M:%S%z"),
                        record.level(),
                        record.target(),
                        record.args()
                    )
                })
                .try_init();
        }
        LogFormat::Json => {
            let log_path = env::var(LOG_PATH_ENV).ok();
            let logger = JsonLogger::new(level, log_path.as_deref());
            match log::set_boxed_logger(Box::new(logger)) {
                Ok(()) => log::set_max_level(level),
                Err(e) => eprintln!("Failed to initialize JSON logger: {e}"),
            }
        }
    }

    (format, level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level_spec() {
        assert_eq!(parse_level_spec("debug"), (LogFormat::Text, LevelFilter::Debug));
        assert_eq!(parse_level_spec(" WARN "), (LogFormat::Text, LevelFilter::Warn));
        assert_eq!(parse_level_spec("json"), (LogFormat::Json, LevelFilter::Info));
        assert_eq!(parse_level_spec("json:trace"), (LogFormat::Json, LevelFilter::Trace));
        assert_eq!(parse_level_spec("off"), (LogFormat::Text, LevelFilter::Off));
        assert_eq!(parse_level_spec("loud"), (LogFormat::Text, LevelFilter::Info));
    }

    #[test]
    fn test_json_logger_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");
        let logger = JsonLogger::new(LevelFilter::Info, path.to_str());

        logger.log(
            &Record::builder()
                .level(log::Level::Warn)
                .target("flashpack::test")
                .args(format_args!("legacy header"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(log::Level::Debug)
                .args(format_args!("filtered"))
                .build(),
        );
        logger.flush();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry["@level"], "warn");
        assert_eq!(entry["@message"], "legacy header");
        assert_eq!(entry["@module"], "flashpack::test");
    }
}
