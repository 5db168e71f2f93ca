//! Composition root for the page-side ad stack
//!
//! Builds the shared tracker, event dispatcher and provider script handle
//! once, and hands them to every display unit created afterwards.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::ads::{
    placement_by_key, spawn_cleanup_task, AdTracker, BaitDetector, BaitHost, BlockDetector,
    ClientContext, Clock, SystemClock,
};
use crate::config::{ProviderConfig, TrackerConfig};
use crate::display::{LazyAdUnit, ProviderHost, ProviderScript};
use crate::sink::{EventDispatcher, EventSink, HttpEventSink, SinkError};

/// Bait-element detector using the configured probe delay
pub fn bait_detector<H>(config: &TrackerConfig, host: H) -> Arc<dyn BlockDetector>
where
    H: BaitHost + 'static,
{
    Arc::new(BaitDetector::with_delay(host, config.probe_delay()))
}

pub struct AdRuntime {
    tracker: Arc<AdTracker>,
    script: Arc<ProviderScript>,
    dispatcher: Arc<EventDispatcher>,
    cleanup: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl AdRuntime {
    /// Wire everything up with an HTTP sink posting to `tracker.sink_url`
    pub fn new(
        tracker: &TrackerConfig,
        provider: &ProviderConfig,
        detector: Arc<dyn BlockDetector>,
        context: ClientContext,
    ) -> Result<Self, SinkError> {
        let sink = Arc::new(HttpEventSink::new(tracker.sink_url.clone())?);
        Ok(Self::with_sink(
            tracker,
            provider,
            detector,
            context,
            sink,
            Arc::new(SystemClock),
        ))
    }

    pub fn with_sink(
        config: &TrackerConfig,
        provider: &ProviderConfig,
        detector: Arc<dyn BlockDetector>,
        context: ClientContext,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new(sink, config.queue_capacity));

        let tracker = Arc::new(
            AdTracker::new(detector)
                .with_clock(clock)
                .with_dispatcher(Arc::clone(&dispatcher))
                .with_client_context(context)
                .with_frequency_limit(config.max_per_hour),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let cleanup = spawn_cleanup_task(
            Arc::clone(&tracker),
            Duration::from_secs(config.cleanup_interval_secs.max(1)),
            shutdown_rx,
        );

        let script = Arc::new(ProviderScript::new(
            provider.script_url.clone(),
            provider.client.clone(),
        ));

        info!(
            max_per_hour = config.max_per_hour,
            queue_capacity = config.queue_capacity,
            "Ad runtime initialized"
        );

        Self {
            tracker,
            script,
            dispatcher,
            cleanup,
            shutdown_tx,
        }
    }

    pub fn tracker(&self) -> &Arc<AdTracker> {
        &self.tracker
    }

    pub fn script(&self) -> &Arc<ProviderScript> {
        &self.script
    }

    /// Create a display unit for a catalog placement
    pub fn placement(
        &self,
        key: &str,
        ad_type: &str,
        host: Arc<dyn ProviderHost>,
    ) -> Option<LazyAdUnit> {
        let config = placement_by_key(key)?;
        Some(LazyAdUnit::new(
            config,
            ad_type,
            Arc::clone(&self.tracker),
            Arc::clone(&self.script),
            host,
        ))
    }

    /// Stop the cleanup task and deliver queued events
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.cleanup.await;
        self.dispatcher.shutdown().await;
        info!("Ad runtime stopped");
    }
}
