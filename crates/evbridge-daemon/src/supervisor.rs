//! Device supervision
//!
//! The outer control loop: discover matching devices, open and grab
//! them, run one session per device, and restart the whole set when any
//! session ends. Restarting everything instead of tracking partial
//! device sets keeps the loop simple; discovery is cheap and the
//! matched devices are few.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use evdev::Device;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{info, warn};

use evbridge_config::Config;

use crate::discovery;
use crate::dispatch::DispatchHandle;
use crate::session::DeviceSession;
use crate::throttle::LogThrottle;

const DISCOVERY_BACKOFF: Duration = Duration::from_secs(2);
const OPEN_ERROR_LOG_WINDOW: Duration = Duration::from_secs(30);

pub struct Supervisor {
    config: Arc<Config>,
    dispatch: DispatchHandle,
    throttle: LogThrottle,
}

impl Supervisor {
    pub fn new(config: Arc<Config>, dispatch: DispatchHandle) -> Self {
        Self {
            config,
            dispatch,
            throttle: LogThrottle::new(OPEN_ERROR_LOG_WINDOW),
        }
    }

    /// Run discovery and session supervision forever. Every recoverable
    /// failure ends in a backoff and another discovery cycle.
    pub async fn run(mut self) {
        loop {
            let paths = discovery::discover_target_paths(&self.config.target_contains);
            if paths.is_empty() {
                if self.throttle.should_log("discovery|no-match") {
                    warn!(
                        "No input devices matching '{}' yet, retrying",
                        self.config.target_contains
                    );
                }
                sleep(DISCOVERY_BACKOFF).await;
                continue;
            }

            let devices = self.open_devices(&paths);
            if devices.is_empty() {
                sleep(DISCOVERY_BACKOFF).await;
                continue;
            }

            self.run_sessions(devices).await;
            warn!("Rediscovering in {}s...", DISCOVERY_BACKOFF.as_secs());
            sleep(DISCOVERY_BACKOFF).await;
        }
    }

    /// Open (and optionally grab) every candidate path. Failures are
    /// logged with per-(path, error) throttling; a permission problem
    /// additionally produces an actionable hint.
    fn open_devices(&mut self, paths: &[PathBuf]) -> Vec<(PathBuf, Device)> {
        let mut opened = Vec::new();
        let mut permission_denied: Vec<&Path> = Vec::new();

        for path in paths {
            match Device::open(path) {
                Ok(mut device) => {
                    info!(
                        "Opened {} name='{}'",
                        path.display(),
                        device.name().unwrap_or("")
                    );
                    if self.config.grab_device {
                        match device.grab() {
                            Ok(()) => info!("Grabbed {} (exclusive access)", path.display()),
                            Err(err) => warn!(
                                "Could not grab {}: {} (will still try to read)",
                                path.display(),
                                err
                            ),
                        }
                    }
                    opened.push((path.clone(), device));
                }
                Err(err) => {
                    let key = format!("{}|{}", path.display(), err);
                    if self.throttle.should_log(&key) {
                        warn!("Failed to open {}: {}", path.display(), err);
                    }
                    if err.kind() == io::ErrorKind::PermissionDenied {
                        permission_denied.push(path);
                    }
                }
            }
        }

        if opened.is_empty() && !permission_denied.is_empty() {
            let hint = permission_hint(&permission_denied);
            if self.throttle.should_log(&format!("perm_hint|{}", hint)) {
                warn!(
                    "Permission denied for input devices ({}). If AppArmor is enabled, \
                     disable it or use a custom AppArmor profile.",
                    hint
                );
            }
        }
        opened
    }

    /// Run one session per device until the first one ends, then tear
    /// down the rest. Aborted sessions drop their streams, which closes
    /// the handles and releases any grabs.
    async fn run_sessions(&mut self, devices: Vec<(PathBuf, Device)>) {
        let mut sessions = JoinSet::new();
        for (path, device) in devices {
            let name = device.name().unwrap_or("").to_string();
            match device.into_event_stream() {
                Ok(stream) => {
                    let session = DeviceSession::new(
                        name,
                        path.display().to_string(),
                        self.dispatch.clone(),
                        self.config.clone(),
                    );
                    sessions.spawn(session.run(stream));
                }
                Err(err) => {
                    warn!(
                        "Failed to create event stream for {}: {}",
                        path.display(),
                        err
                    );
                }
            }
        }

        match sessions.join_next().await {
            Some(Ok(Err(err))) => warn!("Reader ended: {:#}", err),
            Some(Ok(Ok(()))) => {}
            Some(Err(err)) => warn!("Reader task failed: {}", err),
            None => {}
        }
        sessions.shutdown().await;
    }
}

fn permission_hint(paths: &[&Path]) -> String {
    let mut names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    names.sort();
    names.dedup();
    names.join(",")
}
