//! Button name resolution
//!
//! Turns a raw (key code, key name, pending scan code) triple into a
//! logical button name using the merged configuration maps. Resolution
//! never fails: every input either maps to a concrete name or is
//! suppressed, there is no unresolved state.

use std::collections::{HashMap, HashSet};

/// Keycode the kernel reports for keys it has no definition for.
///
/// The target remote sends its app buttons as `KEY_UNKNOWN` plus a
/// distinguishing scan code.
pub const UNKNOWN_KEY_CODE: u16 = 240;

/// Normalize a raw scan value into the lowercase hex form used as the
/// scan map key.
pub fn normalize_scan_value(value: i32) -> String {
    format!("{:x}", value as u32)
}

/// Symbolic name for a keycode, `KEY_<code>` when the kernel has none.
pub fn key_name(code: u16) -> String {
    let name = format!("{:?}", evdev::Key::new(code));
    if name.starts_with("KEY_") || name.starts_with("BTN_") {
        name
    } else {
        format!("KEY_{}", code)
    }
}

/// Resolve a key event to a logical button name.
///
/// Returns `None` when the event should be suppressed. The priority
/// order is load-bearing:
///
/// 1. An explicit keycode mapping always wins, even when a scan code is
///    also present.
/// 2. With a scan code present: the ignore set suppresses the event,
///    then the scan map is consulted, then `KEY_UNKNOWN` events get a
///    synthesized `unknown_scan_<hex>` name so unmapped app buttons are
///    never silently lost.
/// 3. A `KEY_*` symbolic name is stripped, lowercased and run through a
///    small alias table.
/// 4. Anything left becomes `key_<code>`.
pub fn resolve_button(
    code: u16,
    name: &str,
    scan: &str,
    ignore: &HashSet<String>,
    key_map: &HashMap<u16, String>,
    scan_map: &HashMap<String, String>,
) -> Option<String> {
    if let Some(button) = key_map.get(&code) {
        return Some(button.clone());
    }

    if !scan.is_empty() {
        if ignore.contains(scan) {
            return None;
        }
        if let Some(button) = scan_map.get(scan) {
            return Some(button.clone());
        }
        if code == UNKNOWN_KEY_CODE {
            return Some(format!("unknown_scan_{}", scan));
        }
    }

    if let Some(stripped) = name.strip_prefix("KEY_") {
        let derived = stripped.to_lowercase();
        let aliased = match derived.as_str() {
            "select" | "enter" => "ok",
            "esc" => "back",
            "search" => "mic",
            _ => return Some(derived),
        };
        return Some(aliased.to_string());
    }

    Some(format!("key_{}", code))
}
