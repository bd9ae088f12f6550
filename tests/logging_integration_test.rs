//! Integration tests for logging functionality
//!
//! The global subscriber can be installed once per process, so only one test
//! in this binary calls `init_logging`.

use fhirsync::config::LoggingConfig;
use fhirsync::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_path, "/var/log/fhirsync");
}

#[test]
fn test_file_logging_writes_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };
    assert!(!log_path.exists());

    let guard = init_logging("info", &config).unwrap();
    assert!(guard.has_file_output());
    assert!(log_path.is_dir());

    // Dropping the guard flushes the non-blocking writer
    drop(guard);

    let contents = std::fs::read_to_string(log_path.join("fhirsync.log")).unwrap();
    let first_line = contents.lines().next().unwrap();
    let event: serde_json::Value = serde_json::from_str(first_line).unwrap();
    assert_eq!(event["fields"]["message"], "Logging initialized");
}
