//! Bounded fire-and-forget event queue
//!
//! Callers enqueue without waiting. A single worker task owns the sink and
//! delivers events in order, one attempt each. Lost events stay lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::EventSink;
use crate::ads::AnalyticsEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

enum DispatchMessage {
    Deliver(AnalyticsEvent),
    /// Everything queued before this is delivered first
    Shutdown,
}

/// Delivery counters, readable while the worker runs
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Events the sink rejected
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Events that never made it into the queue
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct DispatchWorker {
    receiver: mpsc::Receiver<DispatchMessage>,
    sink: Arc<dyn EventSink>,
    stats: Arc<DispatchStats>,
}

impl DispatchWorker {
    async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                DispatchMessage::Deliver(event) => self.deliver(event).await,
                DispatchMessage::Shutdown => {
                    info!("Event dispatcher received shutdown signal");
                    return;
                }
            }
        }
        warn!("Event dispatcher channel closed without shutdown");
    }

    async fn deliver(&self, event: AnalyticsEvent) {
        match self.sink.send(&event).await {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(ad_id = %event.ad_id, kind = %event.event, "Analytics event delivered");
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    ad_id = %event.ad_id,
                    kind = %event.event,
                    error = %e,
                    "Failed to send analytics event, dropping"
                );
            }
        }
    }
}

pub struct EventDispatcher {
    tx: mpsc::Sender<DispatchMessage>,
    stats: Arc<DispatchStats>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventDispatcher {
    /// Spawn the delivery worker. Must be called inside a tokio runtime.
    pub fn new(sink: Arc<dyn EventSink>, capacity: usize) -> Self {
        let (tx, receiver) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(DispatchStats::default());

        let worker = DispatchWorker {
            receiver,
            sink,
            stats: Arc::clone(&stats),
        };
        let handle = tokio::spawn(worker.run());

        Self {
            tx,
            stats,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Queue an event for delivery. Never blocks; a full queue drops the event.
    pub fn dispatch(&self, event: AnalyticsEvent) {
        match self.tx.try_send(DispatchMessage::Deliver(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(DispatchMessage::Deliver(event))) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(ad_id = %event.ad_id, "Analytics queue full, dropping event");
            }
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Analytics dispatcher stopped, dropping event");
            }
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Deliver what is already queued, then stop the worker
    pub async fn shutdown(&self) {
        let _ = self.tx.send(DispatchMessage::Shutdown).await;

        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Event dispatcher worker ended abnormally: {}", e);
            }
        }
    }
}
