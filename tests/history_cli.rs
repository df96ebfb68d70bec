//! History Subcommand Tests
//!
//! Runs the built binary so stdout is checked exactly as a pipe would see it.

use chrono::{Duration, TimeZone, Utc};
use crowdwatch::storage::{EventLog, SqliteEventLog};
use crowdwatch::types::{Capacity, CrowdingEvent};
use std::path::Path;
use std::process::{Command, Output};

fn run_history(workdir: &Path, config: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crowdwatch"))
        .current_dir(workdir)
        .env_remove("CROWDWATCH_CONFIG")
        .env_remove("CROWDWATCH_BUS_ID")
        .env("RUST_LOG", "info")
        .arg("--config")
        .arg(config)
        .args(["history", "--bus", "BT123"])
        .output()
        .expect("run crowdwatch")
}

fn write_config(dir: &Path, db: &Path) -> std::path::PathBuf {
    let config = dir.join("crowdwatch.toml");
    let body = format!("[storage]\ndb_path = {:?}\n", db.display().to_string());
    std::fs::write(&config, body).expect("write config");
    config
}

#[tokio::test]
async fn history_stdout_is_pure_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("bus_crowding.db");
    {
        let log = SqliteEventLog::open(&db).await.expect("open");
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap();
        let capacity = Capacity::new(50).expect("capacity");
        for i in 0..2 {
            let event = CrowdingEvent::new("BT123", 3 + i, capacity, base + Duration::seconds(i64::from(i)));
            log.log(&event).await.expect("log");
        }
        log.log(&CrowdingEvent::new("BT456", 1, capacity, base)).await.expect("log");
        log.close().await;
    }
    let config = write_config(dir.path(), &db);

    let output = run_history(dir.path(), &config);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout: {stdout}");
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line)
            .unwrap_or_else(|e| panic!("non-JSON line on stdout ({e}): {line}"));
        assert_eq!(value["bus_id"], "BT123");
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 events for bus BT123"), "stderr: {stderr}");
}

#[test]
fn history_with_missing_database_fails_without_creating_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("bus_crowdnig.db");
    let config = write_config(dir.path(), &db);

    let output = run_history(dir.path(), &config);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!db.exists());
}
