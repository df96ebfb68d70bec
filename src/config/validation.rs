//! Config validation: unknown-key detection with Levenshtein suggestions
//! and sanity-range warnings.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path for `MonitorConfig`.
///
/// Kept by hand in step with monitor_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [bus]
        "bus",
        "bus.id",
        "bus.capacity",
        "bus.capacity_threshold",
        // [alert]
        "alert",
        "alert.cooldown_seconds",
        "alert.max_retries",
        "alert.retry_delay_seconds",
        "alert.timeout_seconds",
        // [smtp]
        "smtp",
        "smtp.host",
        "smtp.port",
        "smtp.username",
        "smtp.password",
        "smtp.sender",
        "smtp.recipient",
        // [storage]
        "storage",
        "storage.db_path",
        // [capture]
        "capture",
        "capture.frames_dir",
        "capture.tick_delay_ms",
        // [detector]
        "detector",
        "detector.confidence_threshold",
        "detector.person_class_id",
        "detector.nms_iou_threshold",
        // [overlay]
        "overlay",
        "overlay.snapshot_path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        // tie-break on the key so the suggestion does not depend on hash order
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Never fails: parse errors are reported later by serde.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Warnings
// ============================================================================

/// Suspicious-but-legal values. These are logged, never fatal.
pub fn validate_ranges(config: &super::MonitorConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let a = &config.alert;
    if a.cooldown_seconds > 0 && a.cooldown_seconds < 5 {
        warnings.push(ValidationWarning {
            field: "alert.cooldown_seconds".to_string(),
            message: format!(
                "alert.cooldown_seconds = {} will send an e-mail almost every tick while people are visible",
                a.cooldown_seconds
            ),
            suggestion: None,
        });
    }

    // Worst-case blocking time of one alert: every attempt times out plus the waits.
    let worst_case = a
        .timeout_seconds
        .saturating_mul(u64::from(a.max_retries))
        .saturating_add(a.retry_delay_seconds.saturating_mul(u64::from(a.max_retries.saturating_sub(1))));
    if worst_case > 120 {
        warnings.push(ValidationWarning {
            field: "alert.max_retries".to_string(),
            message: format!(
                "a failing alert can stall the capture loop for up to {worst_case}s"
            ),
            suggestion: None,
        });
    }

    if config.capture.tick_delay_ms > 10_000 {
        warnings.push(ValidationWarning {
            field: "capture.tick_delay_ms".to_string(),
            message: format!(
                "capture.tick_delay_ms = {} processes fewer than one frame every 10 seconds",
                config.capture.tick_delay_ms
            ),
            suggestion: None,
        });
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("cooldown", "cooldown"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("recipent", "recipient"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [alert]
            cooldown_seconds = 30
        "#
        .parse()
        .expect("valid TOML");
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"alert".to_string()));
        assert!(keys.contains(&"alert.cooldown_seconds".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[smtp]
recipent = "ops@example.com"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "smtp.recipent");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("smtp.recipient"));
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[dashboard]\nport = 8080\n");
        assert!(warnings.iter().any(|w| w.field == "dashboard"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_produce_no_range_warnings() {
        let config = crate::config::MonitorConfig::default();
        let warnings = validate_ranges(&config);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_long_retry_chain_warns() {
        let mut config = crate::config::MonitorConfig::default();
        config.alert.max_retries = 10;
        config.alert.timeout_seconds = 30;
        let warnings = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "alert.max_retries"));
    }
}
