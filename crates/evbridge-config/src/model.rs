//! Configuration data model
//!
//! The [`Config`] struct is the single normalized form every other
//! component sees. It is built once at startup by merging the built-in
//! key/scan maps with user overrides and is read-only afterwards.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub const DEFAULT_TARGET_CONTAINS: &str = "Remoter ATV3";
pub const DEFAULT_EVENT_TYPE: &str = "evbridge_command_received";
pub const DEFAULT_IGNORE_SCANCODES: &str = "700aa";
pub const DEFAULT_HOLD_DELAY_SECS: f64 = 0.25;
pub const DEFAULT_HOLD_REPEAT_SECS: f64 = 0.10;
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 256;
pub const DEFAULT_EVENT_POST_TIMEOUT_SECS: f64 = 3.0;

/// Buttons that generate synthetic hold events unless the user says
/// otherwise.
pub const DEFAULT_HOLD_BUTTONS: &[&str] = &[
    "up", "down", "left", "right", "vol_up", "vol_down", "ch_up", "ch_down",
];

/// Built-in keycode -> logical button mapping for the target remote.
pub fn default_key_map() -> HashMap<u16, String> {
    let entries: &[(u16, &str)] = &[
        (116, "power"),
        (139, "menu"),
        (217, "mic"),
        (103, "up"),
        (108, "down"),
        (105, "left"),
        (106, "right"),
        (353, "ok"),
        (158, "back"),
        (172, "home"),
        (113, "mute"),
        (115, "vol_up"),
        (114, "vol_down"),
        (104, "ch_up"),
        (109, "ch_down"),
        (14, "tv_or_backspace"),
    ];
    entries
        .iter()
        .map(|&(code, button)| (code, button.to_string()))
        .collect()
}

/// Built-in scan-code -> logical button mapping.
///
/// Keys are normalized lowercase hex with no `0x` prefix. These cover the
/// app buttons the remote only reports through MSC_SCAN, plus explicit
/// labels for the d-pad scans.
pub fn default_scan_map() -> HashMap<String, String> {
    let entries: &[(&str, &str)] = &[
        // App / special buttons
        ("c000a", "gear"),
        ("c0009", "youtube"),
        ("c000e", "netflix"),
        ("c0005", "disney_plus"),
        ("c0007", "google_play"),
        // Mic behaviour
        ("c0221", "mic"),
        ("700aa", "mic_extra"),
        // D-pad scans, labelled explicitly
        ("c0041", "ok"),
        ("c0042", "up"),
        ("c0043", "down"),
        ("c0044", "left"),
        ("c0045", "right"),
    ];
    entries
        .iter()
        .map(|&(scan, button)| (scan.to_string(), button.to_string()))
        .collect()
}

/// Normalized runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Case-insensitive substring matched against device display names
    pub target_contains: String,
    /// Event type token posted to the sink
    pub event_type: String,
    /// Request exclusive access to matched devices
    pub grab_device: bool,
    /// Scan codes whose events are suppressed outright
    pub ignore_scancodes: HashSet<String>,
    /// Logical buttons eligible for synthetic hold events
    pub hold_buttons: HashSet<String>,
    /// Merged keycode map (defaults overlaid by overrides)
    pub key_map: HashMap<u16, String>,
    /// Merged scan map (defaults overlaid by overrides)
    pub scan_map: HashMap<String, String>,
    /// How many key map entries came from user overrides
    pub key_overrides: usize,
    /// How many scan map entries came from user overrides
    pub scan_overrides: usize,
    /// Initial delay before the first synthetic hold event
    pub hold_delay: Duration,
    /// Interval between synthetic hold events
    pub hold_repeat: Duration,
    /// Dispatch queue capacity
    pub event_queue_size: usize,
    /// Per-delivery HTTP timeout
    pub event_post_timeout: Duration,
    /// Log verbosity
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        let key_map = default_key_map();
        let scan_map = default_scan_map();
        Self {
            target_contains: DEFAULT_TARGET_CONTAINS.to_string(),
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            grab_device: true,
            ignore_scancodes: [DEFAULT_IGNORE_SCANCODES.to_string()].into(),
            hold_buttons: DEFAULT_HOLD_BUTTONS
                .iter()
                .map(|b| b.to_string())
                .collect(),
            key_map,
            scan_map,
            key_overrides: 0,
            scan_overrides: 0,
            hold_delay: Duration::from_secs_f64(DEFAULT_HOLD_DELAY_SECS),
            hold_repeat: Duration::from_secs_f64(DEFAULT_HOLD_REPEAT_SECS),
            event_queue_size: DEFAULT_EVENT_QUEUE_SIZE,
            event_post_timeout: Duration::from_secs_f64(DEFAULT_EVENT_POST_TIMEOUT_SECS),
            log_level: LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string accepted by tracing's `EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}
