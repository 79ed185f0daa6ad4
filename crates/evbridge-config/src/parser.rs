//! Options document parsing
//!
//! The add-on options file is a JSON object whose fields are all
//! optional. Every field is validated independently; a malformed value
//! logs a warning and falls back to its default rather than failing the
//! whole load. Mapping overrides accept three shapes for operator
//! convenience: a JSON object, a JSON object encoded as a string, or a
//! comma-separated `key=value` list.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::error::ConfigError;
use crate::model::*;

/// Read and parse the options file into a raw JSON object.
pub fn read_options(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject);
    }
    Ok(value)
}

/// Load the runtime configuration from the options file.
///
/// Never fails: if the file is missing or malformed the built-in
/// defaults are used and a warning is logged.
pub fn load_config(path: &Path) -> Config {
    match read_options(path) {
        Ok(options) => parse_options(&options),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Could not load options, using defaults");
            Config::default()
        }
    }
}

/// Normalize a raw options object into a [`Config`].
pub fn parse_options(options: &Value) -> Config {
    let defaults = Config::default();

    let log_level = parse_log_level(options.get("log_level"), defaults.log_level);
    let target_contains = parse_target(options.get("target_contains"), &defaults.target_contains);
    let event_type = parse_event_type(options.get("event_type"), &defaults.event_type);
    let grab_device = parse_bool(options.get("grab_device"), "grab_device", defaults.grab_device);
    let ignore_scancodes =
        parse_ignore_scans(options.get("ignore_scancodes"), &defaults.ignore_scancodes);

    let mut key_map = default_key_map();
    let key_overrides = parse_key_map_overrides(options.get("key_map_overrides"), &mut key_map);

    let mut scan_map = default_scan_map();
    let scan_overrides =
        parse_scan_map_overrides(options.get("scan_map_overrides"), &mut scan_map);

    let hold_buttons = parse_hold_buttons(options.get("hold_buttons"), &defaults.hold_buttons);

    let hold_delay = parse_secs_min_zero(
        options.get("hold_delay"),
        "hold_delay",
        defaults.hold_delay,
    );
    let hold_repeat = parse_secs_positive(
        options.get("hold_repeat"),
        "hold_repeat",
        defaults.hold_repeat,
    );
    let event_queue_size = parse_positive_int(
        options.get("event_queue_size"),
        "event_queue_size",
        defaults.event_queue_size,
    );
    let event_post_timeout = parse_secs_positive(
        options.get("event_post_timeout"),
        "event_post_timeout",
        defaults.event_post_timeout,
    );

    Config {
        target_contains,
        event_type,
        grab_device,
        ignore_scancodes,
        hold_buttons,
        key_map,
        scan_map,
        key_overrides,
        scan_overrides,
        hold_delay,
        hold_repeat,
        event_queue_size,
        event_post_timeout,
        log_level,
    }
}

fn parse_log_level(value: Option<&Value>, default: LogLevel) -> LogLevel {
    let Some(raw) = value_as_string(value) else {
        return default;
    };
    match raw.parse() {
        Ok(level) => level,
        Err(_) => {
            warn!(value = %raw, "Invalid log_level, using default");
            default
        }
    }
}

fn parse_target(value: Option<&Value>, default: &str) -> String {
    match value_as_string(value) {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => {
            warn!("target_contains is empty, using default");
            default.to_string()
        }
        None => default.to_string(),
    }
}

/// Event type tokens are restricted to a safe identifier alphabet so
/// the sink URL path stays well-formed.
fn is_valid_event_type(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_event_type(value: Option<&Value>, default: &str) -> String {
    let Some(raw) = value_as_string(value) else {
        return default.to_string();
    };
    let trimmed = raw.trim();
    if is_valid_event_type(trimmed) {
        trimmed.to_string()
    } else {
        warn!(value = %raw, "Invalid event_type, using default");
        default.to_string()
    }
}

fn parse_bool(value: Option<&Value>, field: &str, default: bool) -> bool {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => true,
            "false" | "no" | "off" | "0" => false,
            _ => {
                warn!(field, value = %s, "Invalid boolean, using default");
                default
            }
        },
        Some(other) => {
            warn!(field, value = %other, "Invalid boolean, using default");
            default
        }
    }
}

/// Lowercase a scan token and strip an optional `0x` prefix.
fn normalize_scan_token(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    lower
        .strip_prefix("0x")
        .map(str::to_string)
        .unwrap_or(lower)
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_ignore_scans(value: Option<&Value>, default: &HashSet<String>) -> HashSet<String> {
    let raw_tokens: Vec<String> = match value {
        None | Some(Value::Null) => return default.clone(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(other) => {
            warn!(value = %other, "Invalid ignore_scancodes, using default");
            return default.clone();
        }
    };

    let mut out = HashSet::new();
    for token in raw_tokens {
        let normalized = normalize_scan_token(&token);
        if normalized.is_empty() {
            continue;
        }
        if is_hex(&normalized) {
            out.insert(normalized);
        } else {
            warn!(token = %token, "Ignoring non-hex scan code in ignore_scancodes");
        }
    }
    out
}

/// Fold a button name to lowercase with whitespace runs collapsed to
/// `_`. Names outside `[a-z0-9_]+` are rejected.
fn normalize_button_name(raw: &str) -> Option<String> {
    let folded = raw
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    if !folded.is_empty() && folded.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_')) {
        Some(folded)
    } else {
        None
    }
}

/// Accept a mapping in any of three shapes: a JSON object, a JSON
/// object serialized into a string, or a comma-separated `key=value`
/// (or `key:value`) list.
fn parse_mapping_input(value: &Value, field: &str) -> Option<HashMap<String, String>> {
    match value {
        Value::Object(map) => {
            let mut out = HashMap::new();
            for (k, v) in map {
                match v {
                    Value::String(s) => {
                        out.insert(k.clone(), s.clone());
                    }
                    Value::Number(n) => {
                        out.insert(k.clone(), n.to_string());
                    }
                    other => {
                        warn!(field, key = %k, value = %other, "Skipping non-string mapping value");
                    }
                }
            }
            Some(out)
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Some(HashMap::new());
            }
            if trimmed.starts_with('{') {
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(inner) if inner.is_object() => parse_mapping_input(&inner, field),
                    _ => {
                        warn!(field, "Mapping string is not valid JSON, ignoring");
                        None
                    }
                }
            } else {
                let mut out = HashMap::new();
                for pair in trimmed.split(',') {
                    let pair = pair.trim();
                    if pair.is_empty() {
                        continue;
                    }
                    let Some((k, v)) = pair.split_once('=').or_else(|| pair.split_once(':'))
                    else {
                        warn!(field, entry = %pair, "Skipping malformed mapping entry");
                        continue;
                    };
                    out.insert(k.trim().to_string(), v.trim().to_string());
                }
                Some(out)
            }
        }
        Value::Null => None,
        other => {
            warn!(field, value = %other, "Mapping must be an object or string, ignoring");
            None
        }
    }
}

/// Parse a keycode written in decimal or `0x` hex.
fn parse_key_code(raw: &str) -> Option<u16> {
    let trimmed = raw.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u16::from_str_radix(hex, 16).ok()
    } else {
        trimmed.parse().ok()
    }
}

fn parse_key_map_overrides(value: Option<&Value>, key_map: &mut HashMap<u16, String>) -> usize {
    let Some(value) = value else { return 0 };
    let Some(entries) = parse_mapping_input(value, "key_map_overrides") else {
        return 0;
    };
    let mut applied = 0;
    for (raw_code, raw_button) in entries {
        let Some(code) = parse_key_code(&raw_code) else {
            warn!(key = %raw_code, "Skipping key_map_overrides entry with invalid keycode");
            continue;
        };
        let Some(button) = normalize_button_name(&raw_button) else {
            warn!(key = %raw_code, value = %raw_button, "Skipping key_map_overrides entry with invalid button name");
            continue;
        };
        key_map.insert(code, button);
        applied += 1;
    }
    applied
}

fn parse_scan_map_overrides(value: Option<&Value>, scan_map: &mut HashMap<String, String>) -> usize {
    let Some(value) = value else { return 0 };
    let Some(entries) = parse_mapping_input(value, "scan_map_overrides") else {
        return 0;
    };
    let mut applied = 0;
    for (raw_scan, raw_button) in entries {
        let scan = normalize_scan_token(&raw_scan);
        if !is_hex(&scan) {
            warn!(key = %raw_scan, "Skipping scan_map_overrides entry with non-hex scan code");
            continue;
        }
        let Some(button) = normalize_button_name(&raw_button) else {
            warn!(key = %raw_scan, value = %raw_button, "Skipping scan_map_overrides entry with invalid button name");
            continue;
        };
        scan_map.insert(scan, button);
        applied += 1;
    }
    applied
}

fn parse_hold_buttons(value: Option<&Value>, default: &HashSet<String>) -> HashSet<String> {
    let raw_tokens: Vec<String> = match value {
        None | Some(Value::Null) => return default.clone(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(other) => {
            warn!(value = %other, "Invalid hold_buttons, using default");
            return default.clone();
        }
    };

    let mut out = HashSet::new();
    for token in &raw_tokens {
        if token.trim().is_empty() {
            continue;
        }
        match normalize_button_name(token) {
            Some(button) => {
                out.insert(button);
            }
            None => warn!(token = %token, "Skipping invalid button name in hold_buttons"),
        }
    }
    if out.is_empty() {
        warn!("hold_buttons resolved to an empty set, using default");
        return default.clone();
    }
    out
}

fn value_as_number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_secs_min_zero(value: Option<&Value>, field: &str, default: Duration) -> Duration {
    match value {
        None | Some(Value::Null) => default,
        some => match value_as_number(some) {
            Some(secs) if secs >= 0.0 && secs.is_finite() => Duration::from_secs_f64(secs),
            _ => {
                warn!(field, "Invalid duration, using default");
                default
            }
        },
    }
}

fn parse_secs_positive(value: Option<&Value>, field: &str, default: Duration) -> Duration {
    match value {
        None | Some(Value::Null) => default,
        some => match value_as_number(some) {
            Some(secs) if secs > 0.0 && secs.is_finite() => Duration::from_secs_f64(secs),
            _ => {
                warn!(field, "Invalid duration, using default");
                default
            }
        },
    }
}

fn parse_positive_int(value: Option<&Value>, field: &str, default: usize) -> usize {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) if v > 0 => v as usize,
            _ => {
                warn!(field, "Invalid positive integer, using default");
                default
            }
        },
        Some(Value::String(s)) => match s.trim().parse::<usize>() {
            Ok(v) if v > 0 => v,
            _ => {
                warn!(field, "Invalid positive integer, using default");
                default
            }
        },
        Some(_) => {
            warn!(field, "Invalid positive integer, using default");
            default
        }
    }
}

fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_options_yield_defaults() {
        let config = parse_options(&json!({}));
        let defaults = Config::default();
        assert_eq!(config.target_contains, defaults.target_contains);
        assert_eq!(config.event_type, defaults.event_type);
        assert_eq!(config.grab_device, defaults.grab_device);
        assert_eq!(config.key_map, defaults.key_map);
        assert_eq!(config.scan_map, defaults.scan_map);
        assert_eq!(config.key_overrides, 0);
        assert_eq!(config.scan_overrides, 0);
        assert_eq!(config.hold_delay, defaults.hold_delay);
        assert_eq!(config.event_queue_size, defaults.event_queue_size);
    }

    #[test]
    fn log_level_parses_and_falls_back() {
        let config = parse_options(&json!({"log_level": "debug"}));
        assert_eq!(config.log_level, LogLevel::Debug);

        let config = parse_options(&json!({"log_level": "warning"}));
        assert_eq!(config.log_level, LogLevel::Warn);

        let config = parse_options(&json!({"log_level": "nope"}));
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn event_type_rejects_unsafe_tokens() {
        let config = parse_options(&json!({"event_type": "my_event_v2"}));
        assert_eq!(config.event_type, "my_event_v2");

        let config = parse_options(&json!({"event_type": "bad event/type"}));
        assert_eq!(config.event_type, DEFAULT_EVENT_TYPE);

        let config = parse_options(&json!({"event_type": "2fast"}));
        assert_eq!(config.event_type, DEFAULT_EVENT_TYPE);

        let config = parse_options(&json!({"event_type": ""}));
        assert_eq!(config.event_type, DEFAULT_EVENT_TYPE);
    }

    #[test]
    fn grab_device_accepts_bool_and_string() {
        assert!(!parse_options(&json!({"grab_device": false})).grab_device);
        assert!(!parse_options(&json!({"grab_device": "no"})).grab_device);
        assert!(parse_options(&json!({"grab_device": "on"})).grab_device);
        assert!(parse_options(&json!({"grab_device": "???"})).grab_device);
    }

    #[test]
    fn ignore_scancodes_normalizes_hex() {
        let config = parse_options(&json!({"ignore_scancodes": "0xC000A, 700aa"}));
        assert!(config.ignore_scancodes.contains("c000a"));
        assert!(config.ignore_scancodes.contains("700aa"));
        assert_eq!(config.ignore_scancodes.len(), 2);
    }

    #[test]
    fn ignore_scancodes_accepts_list_form() {
        let config = parse_options(&json!({"ignore_scancodes": ["0xC0041", "zz", "c0042"]}));
        assert!(config.ignore_scancodes.contains("c0041"));
        assert!(config.ignore_scancodes.contains("c0042"));
        assert_eq!(config.ignore_scancodes.len(), 2);
    }

    #[test]
    fn key_map_overrides_from_object() {
        let config = parse_options(
            &json!({"key_map_overrides": {"116": "standby", "0x8B": "settings"}}),
        );
        assert_eq!(config.key_map.get(&116).unwrap(), "standby");
        assert_eq!(config.key_map.get(&139).unwrap(), "settings");
        assert_eq!(config.key_overrides, 2);
        // Untouched defaults survive the overlay
        assert_eq!(config.key_map.get(&103).unwrap(), "up");
    }

    #[test]
    fn key_map_overrides_from_csv_string() {
        let config = parse_options(&json!({"key_map_overrides": "116=standby, 103:up_alt"}));
        assert_eq!(config.key_map.get(&116).unwrap(), "standby");
        assert_eq!(config.key_map.get(&103).unwrap(), "up_alt");
        assert_eq!(config.key_overrides, 2);
    }

    #[test]
    fn key_map_overrides_from_json_string() {
        let config = parse_options(&json!({"key_map_overrides": "{\"217\": \"assistant\"}"}));
        assert_eq!(config.key_map.get(&217).unwrap(), "assistant");
        assert_eq!(config.key_overrides, 1);
    }

    #[test]
    fn malformed_key_map_entries_are_skipped() {
        let config = parse_options(
            &json!({"key_map_overrides": {"not_a_number": "x", "116": "standby"}}),
        );
        assert_eq!(config.key_overrides, 1);
        assert_eq!(config.key_map.get(&116).unwrap(), "standby");
    }

    #[test]
    fn button_names_fold_whitespace_and_reject_bad_charsets() {
        let config = parse_options(
            &json!({"key_map_overrides": {"116": "Power  Toggle", "103": "nope!"}}),
        );
        assert_eq!(config.key_map.get(&116).unwrap(), "power_toggle");
        assert_eq!(config.key_overrides, 1);
        // The rejected entry leaves the default in place
        assert_eq!(config.key_map.get(&103).unwrap(), "up");
    }

    #[test]
    fn scan_map_overrides_require_hex() {
        let config =
            parse_options(&json!({"scan_map_overrides": {"0xC0009": "tube", "nothex": "x"}}));
        assert_eq!(config.scan_map.get("c0009").unwrap(), "tube");
        assert_eq!(config.scan_overrides, 1);
        // Untouched defaults survive the overlay
        assert_eq!(config.scan_map.get("c000e").unwrap(), "netflix");
    }

    #[test]
    fn hold_buttons_from_list_and_csv() {
        let config = parse_options(&json!({"hold_buttons": ["Up", "down"]}));
        assert!(config.hold_buttons.contains("up"));
        assert!(config.hold_buttons.contains("down"));
        assert_eq!(config.hold_buttons.len(), 2);

        let config = parse_options(&json!({"hold_buttons": "vol_up, vol_down"}));
        assert!(config.hold_buttons.contains("vol_up"));
        assert_eq!(config.hold_buttons.len(), 2);
    }

    #[test]
    fn empty_hold_buttons_falls_back_to_default() {
        let config = parse_options(&json!({"hold_buttons": ", ,"}));
        let defaults = Config::default();
        assert_eq!(config.hold_buttons, defaults.hold_buttons);
    }

    #[test]
    fn numeric_fields_fall_back_on_garbage() {
        let config = parse_options(&json!({
            "hold_delay": "fast",
            "hold_repeat": -1,
            "event_queue_size": 0,
            "event_post_timeout": "2.5",
        }));
        let defaults = Config::default();
        assert_eq!(config.hold_delay, defaults.hold_delay);
        assert_eq!(config.hold_repeat, defaults.hold_repeat);
        assert_eq!(config.event_queue_size, defaults.event_queue_size);
        assert_eq!(config.event_post_timeout, Duration::from_secs_f64(2.5));
    }

    #[test]
    fn hold_delay_zero_is_allowed() {
        let config = parse_options(&json!({"hold_delay": 0}));
        assert_eq!(config.hold_delay, Duration::ZERO);
    }

    #[test]
    fn read_options_reports_missing_file() {
        let err = read_options(Path::new("/nonexistent/options.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn read_options_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_options(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn read_options_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let err = read_options(&path).unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject));
    }

    #[test]
    fn load_config_never_fails() {
        let config = load_config(Path::new("/nonexistent/options.json"));
        assert_eq!(config.event_type, DEFAULT_EVENT_TYPE);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, "{\"log_level\": \"trace\"}").unwrap();
        let config = load_config(&path);
        assert_eq!(config.log_level, LogLevel::Trace);
    }
}
