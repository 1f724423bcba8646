use log::LevelFilter;
use maskpaint::logger::{self, LoggerError};

// The logger is process-wide, so everything lives in one test.
#[test]
fn session_log_captures_library_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("maskpaint.log");
    logger::init(&path, LevelFilter::Info).unwrap();
    assert_eq!(logger::log_path(), Some(path.as_path()));

    log::info!(target: "maskpaint::test", "hello {}", 42);
    log::debug!(target: "maskpaint::test", "filtered out");
    log::logger().flush();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("=== MaskPaint session started"));
    assert!(content.contains("] [INFO] maskpaint::test: hello 42"));
    assert!(!content.contains("filtered out"));

    assert!(matches!(
        logger::init(&path, LevelFilter::Trace),
        Err(LoggerError::AlreadyInitialized)
    ));
}
