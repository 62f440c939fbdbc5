//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger formatting and the global logger slot.

use crate::log::{self, Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "forge3d::Test".to_string(),
        message: "frame 3 skipped".to_string(),
        file,
        line,
    }
}

/// Logger capturing entries into a shared vector
#[derive(Clone, Default)]
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_routing() {
    assert!(!LogSeverity::Trace.is_diagnostic());
    assert!(!LogSeverity::Info.is_diagnostic());
    assert!(LogSeverity::Warn.is_diagnostic());
    assert!(LogSeverity::Error.is_diagnostic());
}

#[test]
fn test_log_severity_tags_are_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.tag().len(), 5);
    }
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Warn, None, None));
    assert!(line.contains("[WARN ]"));
    assert!(line.contains("[forge3d::Test]"));
    assert!(line.ends_with("frame 3 skipped"));
}

#[test]
fn test_format_plain_with_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("frame_ring.rs"), Some(42)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("(frame_ring.rs:42)"));
}

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("test.rs"), Some(1)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
    assert_send_sync::<CaptureLogger>();
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_receives_macro_output() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    crate::engine_info!("forge3d::Test", "loaded {} scenes", 2);
    crate::engine_error!("forge3d::Test", "fence wait failed");

    log::reset_logger();

    let entries = capture.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].message, "loaded 2 scenes");
    assert!(entries[0].file.is_none());
    assert_eq!(entries[1].severity, LogSeverity::Error);
    assert!(entries[1].file.is_some());
    assert!(entries[1].line.is_some());
}

#[test]
#[serial]
fn test_engine_err_logs_and_builds_error() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    let err = crate::engine_err!("forge3d::Test", "submit failed: {}", -4);

    log::reset_logger();

    assert_eq!(err, crate::error::Error::BackendError("submit failed: -4".to_string()));
    let entries = capture.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, "forge3d::Test");
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    fn bails(flag: bool) -> crate::error::Result<u32> {
        if flag {
            crate::engine_bail!("forge3d::Test", "bailing out");
        }
        Ok(1)
    }

    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());
    let ok = bails(false);
    let failed = bails(true);
    log::reset_logger();

    assert_eq!(ok, Ok(1));
    assert!(failed.is_err());
    assert_eq!(capture.entries.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());
    log::reset_logger();

    crate::engine_debug!("forge3d::Test", "not captured");
    assert!(capture.entries.lock().unwrap().is_empty());
}
