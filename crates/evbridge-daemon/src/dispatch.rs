//! Dispatch queue
//!
//! A bounded FIFO queue with a single delivery worker, decoupling the
//! device read loops from sink I/O. Producers never block: when the
//! queue is full the new event is dropped and counted. Shutdown drains
//! events queued before `stop()` was called while turning any later
//! `emit` into a no-op.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::event::ButtonEvent;
use crate::sink::EventSink;

struct Shared {
    stopping: AtomicBool,
    dropped: AtomicU64,
    capacity: usize,
}

/// Cloneable producer half of the dispatch queue.
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<ButtonEvent>,
    shared: Arc<Shared>,
}

impl DispatchHandle {
    /// Non-blocking enqueue.
    ///
    /// A full queue drops the event and bumps the drop counter; once
    /// shutdown has begun this is a no-op.
    pub fn emit(&self, event: ButtonEvent) {
        if self.shared.stopping.load(Ordering::SeqCst) {
            return;
        }
        if self.tx.try_send(event).is_err() {
            let dropped = self.shared.dropped.fetch_add(1, Ordering::SeqCst) + 1;
            if should_log_drop(dropped) {
                warn!(
                    "Event queue full (size={}); dropped={}",
                    self.shared.capacity, dropped
                );
            }
        }
    }

    /// Total events dropped due to a full queue.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::SeqCst)
    }
}

/// Log on the first drop and every 25th after that, so a sustained
/// overflow does not flood the log.
fn should_log_drop(dropped: u64) -> bool {
    dropped == 1 || dropped % 25 == 0
}

/// Owns the queue's consumer side and the delivery worker.
pub struct Dispatcher {
    handle: DispatchHandle,
    rx: Option<mpsc::Receiver<ButtonEvent>>,
    worker: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    sink: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn EventSink>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let shared = Arc::new(Shared {
            stopping: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            capacity,
        });
        Self {
            handle: DispatchHandle { tx, shared },
            rx: Some(rx),
            worker: None,
            shutdown_tx: None,
            sink,
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Start the single delivery worker. Idempotent.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);
        let sink = self.sink.clone();
        self.worker = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Queued events are always delivered before the
                    // shutdown signal is observed, which is what makes
                    // stop() a drain rather than a discard.
                    biased;
                    item = rx.recv() => match item {
                        Some(event) => deliver(sink.as_ref(), &event).await,
                        None => break,
                    },
                    _ = &mut shutdown_rx => {
                        while let Ok(event) = rx.try_recv() {
                            deliver(sink.as_ref(), &event).await;
                        }
                        break;
                    }
                }
            }
        }));
    }

    /// Stop accepting new events, deliver everything already queued,
    /// then stop the worker.
    pub async fn stop(mut self) {
        self.handle.shared.stopping.store(true, Ordering::SeqCst);
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

/// Best-effort delivery. Failures are logged and the event is gone; the
/// worker never retries and never stops.
async fn deliver(sink: &dyn EventSink, event: &ButtonEvent) {
    if let Err(err) = sink.deliver(event).await {
        warn!("{}", err);
    }
}
