//! Per-key log throttling
//!
//! A permanently unavailable device would otherwise produce the same
//! warning every discovery cycle. Each distinct message key is allowed
//! through once per window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct LogThrottle {
    window: Duration,
    last: HashMap<String, Instant>,
}

impl LogThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: HashMap::new(),
        }
    }

    /// True when `key` has not been logged within the current window.
    /// A true result marks the key as logged now.
    pub fn should_log(&mut self, key: &str) -> bool {
        let now = Instant::now();
        if let Some(prev) = self.last.get(key) {
            if now.duration_since(*prev) < self.window {
                return false;
            }
        }
        self.last.insert(key.to_string(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_always_logs() {
        let mut throttle = LogThrottle::new(Duration::from_secs(30));
        assert!(throttle.should_log("/dev/input/event3|EACCES"));
    }

    #[test]
    fn repeat_within_window_is_suppressed() {
        let mut throttle = LogThrottle::new(Duration::from_secs(30));
        assert!(throttle.should_log("k"));
        assert!(!throttle.should_log("k"));
    }

    #[test]
    fn distinct_keys_are_independent() {
        let mut throttle = LogThrottle::new(Duration::from_secs(30));
        assert!(throttle.should_log("a"));
        assert!(throttle.should_log("b"));
    }

    #[test]
    fn zero_window_never_suppresses() {
        let mut throttle = LogThrottle::new(Duration::ZERO);
        assert!(throttle.should_log("k"));
        assert!(throttle.should_log("k"));
    }
}
