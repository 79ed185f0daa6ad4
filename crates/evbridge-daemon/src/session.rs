//! Device session
//!
//! One session owns one open device's event stream. It resolves each
//! key transition to a logical button, emits into the dispatch queue
//! and manages the hold timers for buttons currently down on this
//! device. Scan codes arrive on a side channel ahead of their key
//! event; the session latches the most recent one and consumes it
//! exactly once so a stale scan can never attach to a later key.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use evdev::{InputEvent, InputEventKind, MiscType};
use tracing::info;

use evbridge_config::Config;

use crate::dispatch::DispatchHandle;
use crate::event::{now_ts, ButtonEvent, Transition};
use crate::hold::HoldTimer;
use crate::resolver::{key_name, normalize_scan_value, resolve_button};

pub struct DeviceSession {
    device_name: String,
    device_path: String,
    dispatch: DispatchHandle,
    config: Arc<Config>,
    pending_scan: Option<String>,
    holds: HashMap<(u16, String), HoldTimer>,
}

impl DeviceSession {
    pub fn new(
        device_name: String,
        device_path: String,
        dispatch: DispatchHandle,
        config: Arc<Config>,
    ) -> Self {
        Self {
            device_name,
            device_path,
            dispatch,
            config,
            pending_scan: None,
            holds: HashMap::new(),
        }
    }

    /// Read events until the stream fails, then tear down all hold
    /// timers before reporting the error.
    pub async fn run(mut self, mut stream: evdev::EventStream) -> Result<()> {
        info!(
            "Reading device: {} name='{}'",
            self.device_path, self.device_name
        );
        let err = loop {
            match stream.next_event().await {
                Ok(event) => self.handle_raw(event),
                Err(err) => break err,
            }
        };
        self.shutdown().await;
        Err(err).with_context(|| format!("Device read failed: {}", self.device_path))
    }

    /// Process one raw event from the device.
    pub fn handle_raw(&mut self, event: InputEvent) {
        match event.kind() {
            InputEventKind::Misc(MiscType::MSC_SCAN) => {
                self.pending_scan = Some(normalize_scan_value(event.value()));
            }
            InputEventKind::Key(key) => self.handle_key(key.code(), event.value()),
            _ => {}
        }
    }

    fn handle_key(&mut self, code: u16, value: i32) {
        // Kernel autorepeat; our own hold timers are authoritative. The
        // latched scan stays put for the real transition that follows.
        if value == 2 {
            return;
        }
        let transition = match value {
            1 => Transition::KeyDown,
            0 => Transition::KeyUp,
            _ => return,
        };

        let scan = self.pending_scan.take().unwrap_or_default();
        let name = key_name(code);
        let Some(button) = resolve_button(
            code,
            &name,
            &scan,
            &self.config.ignore_scancodes,
            &self.config.key_map,
            &self.config.scan_map,
        ) else {
            return;
        };

        let payload = ButtonEvent {
            device_name: self.device_name.clone(),
            device_path: self.device_path.clone(),
            key_code: code,
            key_name: name,
            scan_code: scan,
            button: button.clone(),
            transition,
            ts: now_ts(),
        };

        match transition {
            Transition::KeyDown => {
                info!(
                    "KEY_DOWN dev={} code={} name={} scan={} button={}",
                    self.device_path, code, payload.key_name, payload.scan_code, button
                );
                self.dispatch.emit(payload.clone());
                if self.config.hold_buttons.contains(&button) {
                    let slot = (code, button);
                    if let Some(old) = self.holds.remove(&slot) {
                        old.cancel();
                    }
                    let timer = HoldTimer::spawn(
                        self.dispatch.clone(),
                        payload,
                        self.config.hold_delay,
                        self.config.hold_repeat,
                    );
                    self.holds.insert(slot, timer);
                }
            }
            Transition::KeyUp => {
                self.dispatch.emit(payload);
                if let Some(timer) = self.holds.remove(&(code, button)) {
                    timer.cancel();
                }
            }
            Transition::KeyHold => unreachable!("hold transitions are synthesized, not read"),
        }
    }

    /// Cancel and await every outstanding hold timer.
    pub async fn shutdown(&mut self) {
        for (_, timer) in self.holds.drain() {
            timer.shutdown().await;
        }
    }
}
