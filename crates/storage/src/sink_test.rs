use super::*;

use std::fs;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

fn test_sink(dir: &TempDir) -> StorageSink {
    let config = SinkConfig::default()
        .with_base_path(dir.path().join("telemetry"))
        .with_flush_interval(Duration::from_millis(10));
    StorageSink::new(config)
}

fn data_files(dir: &TempDir) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = fs::read_dir(dir.path().join("telemetry"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    files
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn test_begin_creates_directory_and_file() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);

    assert!(!sink.is_initialized());
    sink.begin().unwrap();
    assert!(sink.is_initialized());

    let path = sink.current_path().unwrap().to_owned();
    assert!(path.exists());
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("data_"));
    assert!(name.ends_with(".jsonl"));
    assert_eq!(sink.stats().files_created, 1);
}

#[test]
fn test_write_before_begin_fails() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);

    let err = sink.write_message("t", "{}", 0).unwrap_err();
    assert!(matches!(err, StorageError::NotInitialized));
}

#[test]
fn test_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();

    let payloads = [r#"{"value":21.5}"#, r#"{"value":22.0}"#, r#"{"value":22.3}"#];
    for (i, payload) in payloads.iter().enumerate() {
        sink.write_message("sensors/a/temperature", payload, 1000 + i as u64 * 100)
            .unwrap();
    }
    sink.flush().unwrap();

    let lines = read_lines(sink.current_path().unwrap());
    assert_eq!(lines.len(), 3);

    for (i, line) in lines.iter().enumerate() {
        let record: Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["topic"], "sensors/a/temperature");
        assert_eq!(record["timestamp"], 1000 + i as u64 * 100);
        let expected: Value = serde_json::from_str(payloads[i]).unwrap();
        assert_eq!(record["payload"], expected);
    }

    let stats = sink.stats();
    assert_eq!(stats.writes_completed, 3);
    assert_eq!(stats.writes_failed, 0);
}

#[test]
fn test_non_json_payload_escaped_to_string() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();

    sink.write_message("logs/raw", "plain text, not json", 42)
        .unwrap();
    sink.flush().unwrap();

    let lines = read_lines(sink.current_path().unwrap());
    let record: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(record["payload"], "plain text, not json");
}

#[test]
fn test_topic_with_quotes_stays_parseable() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();

    sink.write_message(r#"weird/"topic""#, "{}", 1).unwrap();
    sink.flush().unwrap();

    let lines = read_lines(sink.current_path().unwrap());
    let record: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(record["topic"], r#"weird/"topic""#);
}

#[test]
fn test_oversized_record_fails_without_partial_append() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();

    let huge = format!("{{\"blob\":\"{}\"}}", "x".repeat(MAX_LINE_LEN));
    let err = sink.write_message("t", &huge, 0).unwrap_err();
    assert!(matches!(err, StorageError::LineTooLong { .. }));
    assert_eq!(sink.stats().writes_failed, 1);

    // Nothing reached the file.
    sink.flush().unwrap();
    assert!(read_lines(sink.current_path().unwrap()).is_empty());

    // The sink still accepts normal records afterwards.
    sink.write_message("t", "{}", 1).unwrap();
    sink.flush().unwrap();
    assert_eq!(read_lines(sink.current_path().unwrap()).len(), 1);
}

#[test]
fn test_rotation_at_threshold() {
    let dir = TempDir::new().unwrap();
    let config = SinkConfig::default()
        .with_base_path(dir.path().join("telemetry"))
        .with_max_file_size(1024)
        .with_flush_interval(Duration::from_millis(10));
    let mut sink = StorageSink::new(config);
    sink.begin().unwrap();

    // ~200 bytes per record, 10 records -> at least one rotation.
    let payload = format!("{{\"data\":\"{}\"}}", "a".repeat(180));
    for i in 0..10 {
        sink.write_message("sensors/bulk", &payload, i).unwrap();
    }
    sink.flush().unwrap();

    let files = data_files(&dir);
    assert!(files.len() >= 2, "expected a rotation, got {:?}", files);
    assert_eq!(sink.stats().files_created as usize, files.len());

    // No file overshoots the threshold by more than one record.
    let max_record = payload.len() as u64 + 128;
    for file in &files {
        let size = fs::metadata(file).unwrap().len();
        assert!(
            size <= 1024 + max_record,
            "{} is {} bytes",
            file.display(),
            size
        );
    }

    // Every record survived, across all files in order.
    let mut timestamps = Vec::new();
    for file in &files {
        for line in read_lines(file) {
            let record: Value = serde_json::from_str(&line).unwrap();
            timestamps.push(record["timestamp"].as_u64().unwrap());
        }
    }
    assert_eq!(timestamps, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_rapid_rotation_names_stay_distinct() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();

    // Several rotations inside one wall-clock second.
    sink.rotate().unwrap();
    sink.rotate().unwrap();
    sink.rotate().unwrap();

    let files = data_files(&dir);
    assert_eq!(files.len(), 4);
}

#[test]
fn test_write_batch_flushes_once_and_reports_first_error() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();

    let huge = format!("\"{}\"", "x".repeat(MAX_LINE_LEN));
    let payloads = [r#"{"n":1}"#, huge.as_str(), r#"{"n":2}"#];
    let err = sink.write_batch("batch/topic", &payloads).unwrap_err();
    assert!(matches!(err, StorageError::LineTooLong { .. }));

    // The good records around the failure were still written.
    let lines = read_lines(sink.current_path().unwrap());
    assert_eq!(lines.len(), 2);

    let ok = [r#"{"n":3}"#, r#"{"n":4}"#];
    sink.write_batch("batch/topic", &ok).unwrap();
    assert_eq!(read_lines(sink.current_path().unwrap()).len(), 4);
}

#[test]
fn test_end_closes_file() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();
    sink.write_message("t", "{}", 0).unwrap();

    sink.end();
    assert!(!sink.is_initialized());
    assert!(matches!(
        sink.write_message("t", "{}", 1),
        Err(StorageError::NotInitialized)
    ));

    // begin() again opens a fresh file.
    sink.begin().unwrap();
    assert!(sink.is_initialized());
}

#[test]
fn test_space_probes_nonzero_on_real_volume() {
    let dir = TempDir::new().unwrap();
    let mut sink = test_sink(&dir);
    sink.begin().unwrap();

    assert!(sink.total_space() > 0);
    assert!(sink.free_space() > 0);
}
