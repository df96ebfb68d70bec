//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Bus
// ============================================================================

/// Bus identifier used when none is configured.
pub const DEFAULT_BUS_ID: &str = "BT123";

/// Passenger capacity used to derive the occupancy rate.
pub const DEFAULT_BUS_CAPACITY: u32 = 50;

/// Occupancy ratio considered "crowded". Carried in config but not used by
/// the alert decision, which fires on any detection.
pub const DEFAULT_CAPACITY_THRESHOLD: f64 = 0.8;

// ============================================================================
// Alerting
// ============================================================================

/// Minimum interval between two successful alert e-mails (seconds).
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Delivery attempts per alert, including the first one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fixed wait between failed delivery attempts (seconds).
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Connect / command timeout for the SMTP session (seconds).
pub const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 10;

/// Submission port with STARTTLS.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP reply codes treated as authentication failures (never retried).
pub const SMTP_AUTH_FAILURE_CODES: &[&str] = &["530", "534", "535"];

// ============================================================================
// Storage
// ============================================================================

/// SQLite file holding the `crowding_data` table.
pub const DEFAULT_DB_PATH: &str = "bus_crowding.db";

// ============================================================================
// Capture / Detection
// ============================================================================

/// Directory replayed by the image-directory frame source.
pub const DEFAULT_FRAMES_DIR: &str = "frames";

/// Pause between ticks (milliseconds).
pub const DEFAULT_TICK_DELAY_MS: u64 = 100;

/// Detections at or below this confidence are discarded.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// COCO class id for "person".
pub const PERSON_CLASS_ID: u32 = 0;

/// Non-maximum suppression overlap threshold.
pub const DEFAULT_NMS_IOU_THRESHOLD: f32 = 0.4;

// ============================================================================
// Environment
// ============================================================================

/// Path to the TOML config file.
pub const CONFIG_ENV_VAR: &str = "CROWDWATCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "crowdwatch.toml";
