//! Event payload types
//!
//! A [`ButtonEvent`] is the unit that flows from a device session through
//! the dispatch queue to the sink. It is constructed once per hardware
//! transition and never mutated; synthetic hold events are derived copies
//! with the transition overridden.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of transition a [`ButtonEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    KeyDown,
    KeyUp,
    KeyHold,
}

/// One resolved button transition, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ButtonEvent {
    pub device_name: String,
    pub device_path: String,
    pub key_code: u16,
    pub key_name: String,
    pub scan_code: String,
    pub button: String,
    #[serde(rename = "type")]
    pub transition: Transition,
    pub ts: f64,
}

impl ButtonEvent {
    /// Derive a copy with a different transition.
    ///
    /// Hold events reuse the payload of the down event that started them,
    /// timestamp included.
    pub fn with_transition(&self, transition: Transition) -> Self {
        Self {
            transition,
            ..self.clone()
        }
    }
}

/// Current wall-clock time as fractional seconds since the epoch.
pub fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ButtonEvent {
        ButtonEvent {
            device_name: "Remoter ATV3 Consumer Control".to_string(),
            device_path: "/dev/input/event3".to_string(),
            key_code: 103,
            key_name: "KEY_UP".to_string(),
            scan_code: String::new(),
            button: "up".to_string(),
            transition: Transition::KeyDown,
            ts: 1234.5,
        }
    }

    #[test]
    fn serializes_transition_as_type_field() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "key_down");
        assert_eq!(json["button"], "up");
        assert_eq!(json["key_code"], 103);
    }

    #[test]
    fn with_transition_keeps_payload_and_timestamp() {
        let down = sample();
        let hold = down.with_transition(Transition::KeyHold);
        assert_eq!(hold.transition, Transition::KeyHold);
        assert_eq!(hold.button, down.button);
        assert_eq!(hold.ts, down.ts);
    }
}
