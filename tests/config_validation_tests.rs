//! Config Validation Tests
//!
//! Typo detection, required SMTP settings, range warnings and the file /
//! environment loading path, exercised through the public config API.

use crowdwatch::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use crowdwatch::config::{ConfigError, MonitorConfig};
use std::io::Write;

const COMPLETE_SMTP: &str = r#"
[smtp]
host = "smtp.gmail.com"
sender = "bus-cam@example.com"
recipient = "depot@example.com"
password = "app-password"
"#;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_smtp_section_warns_with_suggestion() {
    let toml_str = r#"
[smtp]
recipent = "depot@example.com"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("recipent"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("smtp.recipient"));
}

#[test]
fn typo_in_alert_section_warns() {
    let toml_str = r#"
[alert]
cooldown_secs = 60
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("alert.cooldown_seconds")
    );
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[bus]
id = "BT123"
capacity = 50
capacity_threshold = 0.8

[alert]
cooldown_seconds = 30
max_retries = 3
retry_delay_seconds = 5
timeout_seconds = 10

[smtp]
host = "smtp.gmail.com"
port = 587
username = "bus-cam@example.com"
password = "app-password"
sender = "bus-cam@example.com"
recipient = "depot@example.com"

[storage]
db_path = "bus_crowding.db"

[capture]
frames_dir = "frames"
tick_delay_ms = 100

[detector]
confidence_threshold = 0.5
person_class_id = 0
nms_iou_threshold = 0.4

[overlay]
snapshot_path = "latest.png"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");
}

#[test]
fn unknown_section_is_reported_without_suggestion() {
    let warnings = validate_unknown_keys("[telemetry]\nendpoint = \"x\"\n");
    assert!(!warnings.is_empty());
    assert!(warnings.iter().any(|w| w.field == "telemetry"));
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn every_section_key_is_known() {
    let known = known_config_keys();
    for key in [
        "bus.capacity",
        "alert.max_retries",
        "smtp.password",
        "storage.db_path",
        "capture.tick_delay_ms",
        "detector.nms_iou_threshold",
        "overlay.snapshot_path",
    ] {
        assert!(known.contains(key), "{key} missing from known keys");
    }
    assert_eq!(
        suggest_correction("capture.frame_dir", &known).as_deref(),
        Some("capture.frames_dir")
    );
}

// ============================================================================
// Required Settings and Ranges
// ============================================================================

#[test]
fn missing_smtp_settings_are_all_reported() {
    let config: MonitorConfig = toml::from_str("").expect("empty toml parses");
    match config.validate() {
        Err(ConfigError::Validation(errors)) => {
            for field in ["smtp.host", "smtp.sender", "smtp.recipient", "smtp.password"] {
                assert!(
                    errors.iter().any(|e| e.starts_with(field)),
                    "{field} not reported in {errors:?}"
                );
            }
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn zero_capacity_is_rejected() {
    let result: Result<MonitorConfig, _> = toml::from_str("[bus]\ncapacity = 0\n");
    assert!(result.is_err(), "capacity 0 must not parse");
}

#[test]
fn threshold_out_of_range_is_rejected() {
    let config: MonitorConfig =
        toml::from_str(&format!("[bus]\ncapacity_threshold = 1.5\n{COMPLETE_SMTP}"))
            .expect("parses");
    let err = config.validate().expect_err("threshold 1.5 is invalid");
    assert!(err.to_string().contains("bus.capacity_threshold"));
}

#[test]
fn short_cooldown_is_a_warning_not_an_error() {
    let config: MonitorConfig =
        toml::from_str(&format!("[alert]\ncooldown_seconds = 2\n{COMPLETE_SMTP}"))
            .expect("parses");
    assert!(config.validate().is_ok());
    let warnings = validate_ranges(&config);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "alert.cooldown_seconds");
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn explicit_file_loads_and_validates() {
    let file = write_config(&format!(
        "[bus]\nid = \"BT777\"\ncapacity = 80\n{COMPLETE_SMTP}"
    ));
    let config = MonitorConfig::load(Some(file.path())).expect("valid config");
    assert_eq!(config.bus.id, "BT777");
    assert_eq!(config.bus.capacity.get(), 80);
    assert_eq!(config.smtp.port, 587);
    assert_eq!(config.smtp.effective_username(), "bus-cam@example.com");
}

#[test]
fn resolve_skips_validation_for_read_only_use() {
    let file = write_config("[storage]\ndb_path = \"elsewhere.db\"\n");
    let config = MonitorConfig::resolve(Some(file.path())).expect("resolves");
    assert_eq!(config.storage.db_path.to_str(), Some("elsewhere.db"));
    assert!(MonitorConfig::load(Some(file.path())).is_err());
}

#[test]
fn malformed_file_is_parse_error() {
    let file = write_config("[bus\nid = ");
    assert!(matches!(
        MonitorConfig::load(Some(file.path())),
        Err(ConfigError::Parse(..))
    ));
}

#[test]
fn missing_explicit_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = MonitorConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Io(..))));
}

#[test]
fn env_overrides_complete_a_partial_file() {
    let mut config: MonitorConfig = toml::from_str("[smtp]\nhost = \"smtp.gmail.com\"\n")
        .expect("parses");
    config
        .apply_env_overrides(|key| match key {
            "CROWDWATCH_SENDER_EMAIL" => Some("cam@example.com".to_string()),
            "CROWDWATCH_RECIPIENT_EMAIL" => Some("ops@example.com".to_string()),
            "CROWDWATCH_SMTP_PASSWORD" => Some("hunter2".to_string()),
            "CROWDWATCH_SMTP_HOST" => Some("   ".to_string()),
            _ => None,
        })
        .expect("overrides apply");

    assert_eq!(config.smtp.host, "smtp.gmail.com", "blank override ignored");
    assert!(config.validate().is_ok());
    assert!(!format!("{:?}", config.smtp).contains("hunter2"));
}

#[test]
fn config_round_trips_through_toml() {
    let config: MonitorConfig = toml::from_str(COMPLETE_SMTP).expect("parses");
    let rendered = config.to_toml().expect("serializes");
    assert!(validate_unknown_keys(&rendered).is_empty());
    let reparsed: MonitorConfig = toml::from_str(&rendered).expect("reparses");
    assert_eq!(reparsed.smtp.recipient, "depot@example.com");
    assert_eq!(reparsed.alert.cooldown_seconds, 30);
}
