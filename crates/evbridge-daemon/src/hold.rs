//! Hold-repeat simulation
//!
//! Kernel autorepeat events are discarded by the device session; this
//! timer is the sole source of repeat semantics. Each timer waits an
//! initial delay, then emits one synthetic `key_hold` per repeat
//! interval until cancelled. Cancellation is idempotent and never emits
//! an event of its own.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::dispatch::DispatchHandle;
use crate::event::{ButtonEvent, Transition};

/// One running hold timer for a (key code, button) pair.
pub struct HoldTimer {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl HoldTimer {
    /// Spawn a timer that reuses `base` (a down-event payload) for every
    /// synthetic hold it emits.
    pub fn spawn(
        dispatch: DispatchHandle,
        base: ButtonEvent,
        delay: Duration,
        repeat: Duration,
    ) -> Self {
        let (cancel, mut cancelled) = watch::channel(false);
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancelled.changed() => return,
            }
            loop {
                if *cancelled.borrow() {
                    return;
                }
                dispatch.emit(base.with_transition(Transition::KeyHold));
                tokio::select! {
                    _ = sleep(repeat) => {}
                    _ = cancelled.changed() => return,
                }
            }
        });
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Signal the timer to stop. Safe to call more than once; the task
    /// winds down on its own.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Cancel and wait for the timer task to finish.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
