// Installs the global subscriber, so everything lives in one test.

use revclass::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};
use std::fs;
use tempfile::TempDir;
use tracing::{info, instrument, warn};

#[test]
fn test_file_layer_writes_json_lines() {
    let temp_dir = TempDir::new().unwrap();

    let config = LogConfig {
        level: "info".to_string(),
        format: LogFormat::Pretty,
        log_dir: Some(temp_dir.path().to_path_buf()),
        rotation: RotationPolicy::Never,
        retention_days: 30,
    };

    let logger = LoggerImpl::init(&config).unwrap();

    info!(customer_id = "c-1", updated = 3, "bulk update applied");
    let total = instrumented_apply(2, 5);
    assert_eq!(total, 7);
    warn!(kind = "classifier_unavailable", "classifier call failed");

    // Dropping the guard flushes the non-blocking writer.
    drop(logger);

    let log_files: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|s| s.contains("revclass.log"))
                .unwrap_or(false)
        })
        .collect();
    assert!(!log_files.is_empty(), "Log file should be created");

    let contents = fs::read_to_string(log_files[0].path()).unwrap();
    assert!(contents.contains("bulk update applied"));
    assert!(contents.contains("classifier call failed"));
    assert!(contents.contains("instrumented_apply"), "span name should be recorded");

    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        let value: serde_json::Value = serde_json::from_str(line).expect("every file line is JSON");
        assert!(value.get("level").is_some());
    }
}

#[instrument]
fn instrumented_apply(records: u32, extra: u32) -> u32 {
    info!("applying");
    records + extra
}
