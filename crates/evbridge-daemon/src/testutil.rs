//! Shared test doubles for the dispatch pipeline.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::event::{ButtonEvent, Transition};
use crate::sink::{DeliveryError, EventSink};

/// Sink that records every delivered event, optionally failing each
/// delivery after recording it.
pub struct RecordingSink {
    delivered: Mutex<Vec<ButtonEvent>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<ButtonEvent> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn count(&self, transition: Transition) -> usize {
        self.events()
            .iter()
            .filter(|e| e.transition == transition)
            .count()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn deliver(&self, event: &ButtonEvent) -> Result<(), DeliveryError> {
        self.delivered.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(DeliveryError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }
}

pub fn sample_event(button: &str, transition: Transition) -> ButtonEvent {
    ButtonEvent {
        device_name: "Remoter ATV3 Consumer Control".to_string(),
        device_path: "/dev/input/event3".to_string(),
        key_code: 103,
        key_name: "KEY_UP".to_string(),
        scan_code: String::new(),
        button: button.to_string(),
        transition,
        ts: 0.0,
    }
}
