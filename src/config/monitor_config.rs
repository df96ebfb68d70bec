//! Monitor Configuration - bus identity, alerting, SMTP, storage and capture settings
//!
//! Each section implements `Default` with the values the detector has always
//! shipped with, so an empty file only needs the SMTP credentials filled in.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::types::Capacity;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one camera / bus deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Bus identity and capacity
    #[serde(default)]
    pub bus: BusConfig,

    /// Alert cooldown and retry policy
    #[serde(default)]
    pub alert: AlertConfig,

    /// SMTP relay and addresses
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Event log location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Frame source settings
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Detector adapter settings
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Debug overlay output
    #[serde(default)]
    pub overlay: OverlayConfig,
}

impl MonitorConfig {
    /// Load, apply environment overrides and validate.
    ///
    /// `explicit` is the `--config` / `CROWDWATCH_CONFIG` path. When it is
    /// absent, `./crowdwatch.toml` is used if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::resolve(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) but without validation, for read-only tools
    /// that never send mail.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                let config = Self::load_from_file(path)?;
                info!(path = %path.display(), bus = %config.bus.id, "Loaded monitor config");
                config
            }
            None => {
                let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
                if local.exists() {
                    let config = Self::load_from_file(&local)?;
                    info!(bus = %config.bus.id, "Loaded monitor config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    config
                } else {
                    info!("No {} found, using built-in defaults", defaults::LOCAL_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a specific TOML file. Unknown keys are warned about, not rejected.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Overlay values from the environment (or any other key lookup).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("CROWDWATCH_BUS_ID") {
            self.bus.id = v;
        }
        if let Some(v) = non_empty("CROWDWATCH_SMTP_HOST") {
            self.smtp.host = v;
        }
        if let Some(v) = non_empty("CROWDWATCH_SMTP_PORT") {
            self.smtp.port = v.trim().parse().map_err(|_| ConfigError::Env {
                var: "CROWDWATCH_SMTP_PORT".to_string(),
                message: format!("'{v}' is not a valid port"),
            })?;
        }
        if let Some(v) = non_empty("CROWDWATCH_SMTP_USERNAME") {
            self.smtp.username = v;
        }
        if let Some(v) = non_empty("CROWDWATCH_SMTP_PASSWORD") {
            self.smtp.password = v;
        }
        if let Some(v) = non_empty("CROWDWATCH_SENDER_EMAIL") {
            self.smtp.sender = v;
        }
        if let Some(v) = non_empty("CROWDWATCH_RECIPIENT_EMAIL") {
            self.smtp.recipient = v;
        }
        Ok(())
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every setting, collecting all problems before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.bus.id.trim().is_empty() {
            errors.push("bus.id must not be empty".to_string());
        }
        let threshold = self.bus.capacity_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            errors.push(format!(
                "bus.capacity_threshold ({threshold}) must be in (0, 1]"
            ));
        }

        let a = &self.alert;
        if a.cooldown_seconds == 0 {
            errors.push("alert.cooldown_seconds must be > 0".to_string());
        }
        if a.max_retries == 0 {
            errors.push("alert.max_retries must be >= 1".to_string());
        }
        if a.timeout_seconds == 0 {
            errors.push("alert.timeout_seconds must be > 0".to_string());
        }

        let s = &self.smtp;
        Self::check_required(&s.host, "smtp.host", "CROWDWATCH_SMTP_HOST", &mut errors);
        Self::check_required(&s.sender, "smtp.sender", "CROWDWATCH_SENDER_EMAIL", &mut errors);
        Self::check_required(&s.recipient, "smtp.recipient", "CROWDWATCH_RECIPIENT_EMAIL", &mut errors);
        Self::check_required(&s.password, "smtp.password", "CROWDWATCH_SMTP_PASSWORD", &mut errors);
        if s.port == 0 {
            errors.push("smtp.port must be > 0".to_string());
        }
        Self::check_mailbox(&s.sender, "smtp.sender", &mut errors);
        Self::check_mailbox(&s.recipient, "smtp.recipient", &mut errors);

        if self.storage.db_path.as_os_str().is_empty() {
            errors.push("storage.db_path must not be empty".to_string());
        }

        for (key, value) in [
            ("detector.confidence_threshold", self.detector.confidence_threshold),
            ("detector.nms_iou_threshold", self.detector.nms_iou_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                errors.push(format!("{key} ({value}) must be in [0, 1]"));
            }
        }

        for w in super::validation::validate_ranges(self) {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_required(value: &str, name: &str, env: &str, errors: &mut Vec<String>) {
        if value.trim().is_empty() {
            errors.push(format!("{name} is required (set it in the config file or via {env})"));
        }
    }

    fn check_mailbox(value: &str, name: &str, errors: &mut Vec<String>) {
        if value.trim().is_empty() {
            return;
        }
        if let Err(e) = value.parse::<lettre::message::Mailbox>() {
            errors.push(format!("{name} '{value}' is not a valid e-mail address: {e}"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid environment override {var}: {message}")]
    Env { var: String, message: String },
    #[error("Config validation failed:\n{}", bullet_list(.0))]
    Validation(Vec<String>),
}

fn bullet_list(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Bus
// ============================================================================

/// Identification and capacity of the monitored vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Identifier written to every event and alert
    #[serde(default = "default_bus_id")]
    pub id: String,

    /// Passenger capacity; zero is rejected at parse time
    #[serde(default)]
    pub capacity: Capacity,

    /// Crowding ratio. Loaded and reported, but alerts fire on any detection.
    #[serde(default = "default_capacity_threshold")]
    pub capacity_threshold: f64,
}

fn default_bus_id() -> String {
    defaults::DEFAULT_BUS_ID.to_string()
}
fn default_capacity_threshold() -> f64 {
    defaults::DEFAULT_CAPACITY_THRESHOLD
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            id: default_bus_id(),
            capacity: Capacity::default(),
            capacity_threshold: default_capacity_threshold(),
        }
    }
}

// ============================================================================
// Alert
// ============================================================================

/// Cooldown and delivery retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minimum seconds between two successful alerts.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Delivery attempts per alert, first attempt included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait between failed attempts (seconds).
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,

    /// SMTP connect / command timeout (seconds).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_cooldown_seconds() -> u64 { defaults::DEFAULT_COOLDOWN_SECS }
fn default_max_retries() -> u32 { defaults::DEFAULT_MAX_RETRIES }
fn default_retry_delay_seconds() -> u64 { defaults::DEFAULT_RETRY_DELAY_SECS }
fn default_timeout_seconds() -> u64 { defaults::DEFAULT_SMTP_TIMEOUT_SECS }

impl AlertConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

// ============================================================================
// SMTP
// ============================================================================

/// SMTP relay and envelope addresses. Host, sender, recipient and password
/// have no usable default and must be provided.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Login name; falls back to `sender` when empty
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub sender: String,

    #[serde(default)]
    pub recipient: String,
}

fn default_smtp_port() -> u16 {
    defaults::DEFAULT_SMTP_PORT
}

impl SmtpConfig {
    pub fn effective_username(&self) -> &str {
        if self.username.trim().is_empty() {
            &self.sender
        } else {
            &self.username
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            sender: String::new(),
            recipient: String::new(),
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .finish()
    }
}

// ============================================================================
// Storage / Capture / Detector / Overlay
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_DB_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory of frames replayed in file-name order
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,

    /// Pause between ticks (milliseconds, 0 = run flat out)
    #[serde(default = "default_tick_delay_ms")]
    pub tick_delay_ms: u64,
}

fn default_frames_dir() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_FRAMES_DIR)
}
fn default_tick_delay_ms() -> u64 {
    defaults::DEFAULT_TICK_DELAY_MS
}

impl CaptureConfig {
    pub fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.tick_delay_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames_dir: default_frames_dir(),
            tick_delay_ms: default_tick_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    #[serde(default = "default_person_class_id")]
    pub person_class_id: u32,

    /// Boxes overlapping a higher-scored box by more than this IoU are dropped
    #[serde(default = "default_nms_iou_threshold")]
    pub nms_iou_threshold: f32,
}

fn default_confidence_threshold() -> f32 {
    defaults::DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_person_class_id() -> u32 {
    defaults::PERSON_CLASS_ID
}
fn default_nms_iou_threshold() -> f32 {
    defaults::DEFAULT_NMS_IOU_THRESHOLD
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            person_class_id: default_person_class_id(),
            nms_iou_threshold: default_nms_iou_threshold(),
        }
    }
}

/// Debug overlay output. No snapshot path means the overlay is discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

// ============================================================================
// Tests
// ============================================================================
