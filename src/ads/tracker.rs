//! Ad frequency capping and local analytics
//!
//! One tracker is built by the composition root and shared as
//! `Arc<AdTracker>` by every display unit. Counters live in concurrent maps
//! so that each impression maps to exactly one hourly bucket increment even
//! on a multi-threaded runtime.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::detector::BlockDetector;
use super::models::{
    AdAnalytics, AnalyticsEvent, ClientContext, EventKind, FrequencyKey, HOUR_MS,
};
use crate::sink::EventDispatcher;

/// Impressions allowed per ad type per clock hour
pub const DEFAULT_MAX_PER_HOUR: u32 = 3;

pub struct AdTracker {
    detector: Arc<dyn BlockDetector>,
    clock: Arc<dyn Clock>,
    dispatcher: Option<Arc<EventDispatcher>>,
    context: ClientContext,
    max_per_hour: AtomicU32,
    ad_block_detected: AtomicBool,
    frequency: DashMap<FrequencyKey, u32>,
    analytics: DashMap<String, AdAnalytics>,
}

impl AdTracker {
    pub fn new(detector: Arc<dyn BlockDetector>) -> Self {
        Self {
            detector,
            clock: Arc::new(SystemClock),
            dispatcher: None,
            context: ClientContext::default(),
            max_per_hour: AtomicU32::new(DEFAULT_MAX_PER_HOUR),
            ad_block_detected: AtomicBool::new(false),
            frequency: DashMap::new(),
            analytics: DashMap::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Forward every recorded event through `dispatcher`
    pub fn with_dispatcher(mut self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_client_context(mut self, context: ClientContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_frequency_limit(self, limit: u32) -> Self {
        self.set_frequency_limit(limit);
        self
    }

    /// Probe for content blocking and remember the answer.
    ///
    /// A failing probe counts as "not blocked".
    pub async fn detect_ad_block(&self) -> bool {
        let blocked = match self.detector.probe().await {
            Ok(blocked) => blocked,
            Err(e) => {
                warn!("Ad-block detection failed, assuming not blocked: {:#}", e);
                false
            }
        };

        self.ad_block_detected.store(blocked, Ordering::Relaxed);
        blocked
    }

    /// Last detection result; does not probe again
    pub fn is_ad_block_detected(&self) -> bool {
        self.ad_block_detected.load(Ordering::Relaxed)
    }

    pub fn can_show_ad(&self, ad_type: &str) -> bool {
        if is_blank(ad_type) {
            warn!(ad_type, "Invalid ad type provided to can_show_ad");
            return false;
        }

        let key = FrequencyKey::new(ad_type, self.clock.now_ms());
        let shown = self.frequency.get(&key).map(|count| *count).unwrap_or(0);

        shown < self.frequency_limit()
    }

    pub fn record_ad_impression(&self, ad_id: &str, ad_type: &str) {
        if is_blank(ad_id) || is_blank(ad_type) {
            warn!(ad_id, ad_type, "Invalid parameters for record_ad_impression");
            return;
        }

        let now = self.clock.now_ms();

        *self
            .frequency
            .entry(FrequencyKey::new(ad_type, now))
            .or_insert(0) += 1;

        self.count_impression(ad_id, ad_type, now);
    }

    /// Check the hourly cap and record an impression in one step.
    ///
    /// The bucket stays locked between the check and the increment, so
    /// concurrent callers of the same type never exceed the limit. Returns
    /// `false` without recording when the cap is reached.
    pub fn try_record_impression(&self, ad_id: &str, ad_type: &str) -> bool {
        if is_blank(ad_id) || is_blank(ad_type) {
            warn!(ad_id, ad_type, "Invalid parameters for try_record_impression");
            return false;
        }

        let now = self.clock.now_ms();
        let limit = self.frequency_limit();

        {
            let mut shown = self
                .frequency
                .entry(FrequencyKey::new(ad_type, now))
                .or_insert(0);
            if *shown >= limit {
                return false;
            }
            *shown += 1;
        }

        self.count_impression(ad_id, ad_type, now);
        true
    }

    fn count_impression(&self, ad_id: &str, ad_type: &str, now: i64) {
        self.analytics
            .entry(ad_id.to_string())
            .and_modify(|a| {
                a.impressions += 1;
                a.recompute_ctr();
            })
            .or_insert_with(|| {
                let mut a = AdAnalytics {
                    impressions: 1,
                    ..Default::default()
                };
                a.recompute_ctr();
                a
            });

        debug!(ad_id, ad_type, "Ad impression recorded");
        self.emit(EventKind::Impression, ad_id, ad_type, now);
    }

    pub fn record_ad_click(&self, ad_id: &str, ad_type: &str) {
        if is_blank(ad_id) || is_blank(ad_type) {
            warn!(ad_id, ad_type, "Invalid parameters for record_ad_click");
            return;
        }

        let now = self.clock.now_ms();

        let mut entry = self.analytics.entry(ad_id.to_string()).or_default();
        if entry.impressions == 0 {
            warn!(ad_id, ad_type, "Click recorded for an ad with no impressions");
        }
        entry.clicks += 1;
        entry.recompute_ctr();
        drop(entry);

        debug!(ad_id, ad_type, "Ad click recorded");
        self.emit(EventKind::Click, ad_id, ad_type, now);
    }

    fn emit(&self, kind: EventKind, ad_id: &str, ad_type: &str, timestamp: i64) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.dispatch(AnalyticsEvent::new(
                kind,
                ad_id,
                ad_type,
                timestamp,
                &self.context,
            ));
        }
    }

    pub fn get_analytics(&self, ad_id: &str) -> Option<AdAnalytics> {
        if is_blank(ad_id) {
            warn!(ad_id, "Invalid ad id provided to get_analytics");
            return None;
        }
        self.analytics.get(ad_id).map(|entry| *entry.value())
    }

    pub fn all_analytics(&self) -> HashMap<String, AdAnalytics> {
        self.analytics
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Change the hourly cap. Zero is rejected and the old limit kept.
    pub fn set_frequency_limit(&self, limit: u32) {
        if limit == 0 {
            warn!(limit, "Invalid frequency limit, keeping current value");
            return;
        }
        self.max_per_hour.store(limit, Ordering::Relaxed);
    }

    pub fn frequency_limit(&self) -> u32 {
        self.max_per_hour.load(Ordering::Relaxed)
    }

    /// Drop buckets older than the previous hour.
    ///
    /// Not scheduled by the tracker; see [`spawn_cleanup_task`].
    pub fn cleanup_expired_frequency_data(&self) -> usize {
        let current_hour = self.clock.now_ms().div_euclid(HOUR_MS);
        let before = self.frequency.len();

        self.frequency.retain(|key, _| key.hour_epoch >= current_hour - 1);

        let removed = before.saturating_sub(self.frequency.len());
        if removed > 0 {
            debug!(removed, "Expired frequency buckets removed");
        }
        removed
    }

    /// Number of live frequency buckets
    pub fn frequency_bucket_count(&self) -> usize {
        self.frequency.len()
    }

    /// Clear all in-memory state. The frequency limit is kept.
    pub fn reset(&self) {
        self.ad_block_detected.store(false, Ordering::Relaxed);
        self.frequency.clear();
        self.analytics.clear();
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Periodically call [`AdTracker::cleanup_expired_frequency_data`] until
/// `shutdown` flips to `true`.
pub fn spawn_cleanup_task(
    tracker: Arc<AdTracker>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first tick which fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracker.cleanup_expired_frequency_data();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Frequency cleanup task shutting down");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::clock::ManualClock;
    use crate::ads::detector::StaticDetector;
    use crate::sink::{EventSink, SinkError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const T0: i64 = 1_700_000_000_000;

    fn tracker_at(clock: Arc<ManualClock>) -> AdTracker {
        AdTracker::new(Arc::new(StaticDetector::new(false))).with_clock(clock)
    }

    struct ErrorDetector;

    #[async_trait]
    impl BlockDetector for ErrorDetector {
        async fn probe(&self) -> anyhow::Result<bool> {
            anyhow::bail!("document not ready")
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<AnalyticsEvent>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn send(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn test_frequency_cap_within_hour() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)));

        for _ in 0..3 {
            assert!(tracker.can_show_ad("sidebar"));
            tracker.record_ad_impression("sidebar-square-ad", "sidebar");
        }
        assert!(!tracker.can_show_ad("sidebar"));

        tracker.record_ad_impression("sidebar-square-ad", "sidebar");
        assert!(!tracker.can_show_ad("sidebar"));

        // Other types are capped independently
        assert!(tracker.can_show_ad("banner"));
    }

    #[test]
    fn test_frequency_cap_resets_next_hour() {
        let clock = Arc::new(ManualClock::new(T0));
        let tracker = tracker_at(clock.clone());

        for _ in 0..3 {
            tracker.record_ad_impression("a", "banner");
        }
        assert!(!tracker.can_show_ad("banner"));

        clock.advance(HOUR_MS);
        assert!(tracker.can_show_ad("banner"));
    }

    #[test]
    fn test_custom_frequency_limit() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0))).with_frequency_limit(1);
        assert_eq!(tracker.frequency_limit(), 1);

        tracker.record_ad_impression("a", "banner");
        assert!(!tracker.can_show_ad("banner"));

        tracker.set_frequency_limit(0);
        assert_eq!(tracker.frequency_limit(), 1);
    }

    #[test]
    fn test_impression_then_click_ctr() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)));

        tracker.record_ad_impression("x", "banner");
        tracker.record_ad_click("x", "banner");

        let analytics = tracker.get_analytics("x").unwrap();
        assert_eq!(analytics.impressions, 1);
        assert_eq!(analytics.clicks, 1);
        assert_eq!(analytics.ctr, 100.0);
        assert_eq!(analytics.revenue, 0.0);
    }

    #[test]
    fn test_ctr_tracks_counters() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)));

        for _ in 0..4 {
            tracker.record_ad_impression("x", "banner");
        }
        tracker.record_ad_click("x", "banner");
        assert_eq!(tracker.get_analytics("x").unwrap().ctr, 25.0);

        tracker.record_ad_impression("x", "banner");
        let analytics = tracker.get_analytics("x").unwrap();
        assert_eq!(analytics.ctr, 1.0 / 5.0 * 100.0);
    }

    #[test]
    fn test_click_without_impression_has_zero_ctr() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)));

        tracker.record_ad_click("orphan", "banner");

        let analytics = tracker.get_analytics("orphan").unwrap();
        assert_eq!(analytics.impressions, 0);
        assert_eq!(analytics.clicks, 1);
        assert_eq!(analytics.ctr, 0.0);
        assert!(!analytics.ctr.is_nan());
    }

    #[test]
    fn test_invalid_input_is_noop() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)));

        assert!(!tracker.can_show_ad(""));
        assert!(!tracker.can_show_ad("   "));

        tracker.record_ad_impression("", "banner");
        tracker.record_ad_impression("x", "");
        tracker.record_ad_click("", "banner");

        assert!(!tracker.try_record_impression("", "banner"));
        assert!(!tracker.try_record_impression("x", " "));

        assert!(tracker.all_analytics().is_empty());
        assert_eq!(tracker.frequency_bucket_count(), 0);
        assert!(tracker.get_analytics("").is_none());
        assert!(tracker.get_analytics("  ").is_none());
    }

    #[test]
    fn test_try_record_impression_stops_at_cap() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)));

        assert!(tracker.try_record_impression("a", "banner"));
        assert!(tracker.try_record_impression("b", "banner"));
        assert!(tracker.try_record_impression("a", "banner"));
        assert!(!tracker.try_record_impression("c", "banner"));

        assert_eq!(tracker.get_analytics("a").unwrap().impressions, 2);
        assert!(tracker.get_analytics("c").is_none());
        assert!(!tracker.can_show_ad("banner"));
        assert!(tracker.try_record_impression("c", "sidebar"));
    }

    #[test]
    fn test_cleanup_keeps_current_and_previous_hour() {
        let clock = Arc::new(ManualClock::new(T0));
        let tracker = tracker_at(clock.clone());

        tracker.record_ad_impression("a", "two-hours-ago");
        clock.advance(HOUR_MS);
        tracker.record_ad_impression("a", "last-hour");
        clock.advance(HOUR_MS);
        tracker.record_ad_impression("a", "this-hour");
        assert_eq!(tracker.frequency_bucket_count(), 3);

        let removed = tracker.cleanup_expired_frequency_data();
        assert_eq!(removed, 1);
        assert_eq!(tracker.frequency_bucket_count(), 2);

        // Current-hour counts are intact
        tracker.set_frequency_limit(1);
        assert!(!tracker.can_show_ad("this-hour"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)));

        for id in ["a", "b", "c"] {
            tracker.record_ad_impression(id, "banner");
        }
        tracker.reset();

        for id in ["a", "b", "c"] {
            assert!(tracker.get_analytics(id).is_none());
        }
        assert!(tracker.can_show_ad("banner"));
        assert!(!tracker.is_ad_block_detected());
    }

    #[tokio::test]
    async fn test_detection_is_sticky() {
        let tracker = AdTracker::new(Arc::new(StaticDetector::new(true)));

        assert!(!tracker.is_ad_block_detected());
        assert!(tracker.detect_ad_block().await);
        assert!(tracker.is_ad_block_detected());
    }

    #[tokio::test]
    async fn test_detection_fails_open() {
        let tracker = AdTracker::new(Arc::new(ErrorDetector));

        assert!(!tracker.detect_ad_block().await);
        assert!(!tracker.is_ad_block_detected());
    }

    #[tokio::test]
    async fn test_events_forwarded_with_context() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(EventDispatcher::new(sink.clone(), 8));
        let context = ClientContext {
            user_agent: "agent/1.0".to_string(),
            url: "https://example.com/project/1".to_string(),
            referrer: Some("https://example.com/".to_string()),
            screen_resolution: Some("1920x1080".to_string()),
            viewport_size: Some("1280x720".to_string()),
        };
        let tracker = tracker_at(Arc::new(ManualClock::new(T0)))
            .with_dispatcher(dispatcher.clone())
            .with_client_context(context.clone());

        tracker.record_ad_impression("x", "banner");
        tracker.record_ad_click("x", "banner");
        dispatcher.shutdown().await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, EventKind::Impression);
        assert_eq!(events[1].event, EventKind::Click);
        assert_eq!(events[0].timestamp, T0);
        assert_eq!(events[1].user_agent, context.user_agent);
        assert_eq!(events[1].referrer, context.referrer);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_impressions_are_counted_once() {
        let tracker = Arc::new(
            tracker_at(Arc::new(ManualClock::new(T0))).with_frequency_limit(10_000),
        );

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                for _ in 0..250 {
                    tracker.record_ad_impression("hot", "banner");
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(tracker.get_analytics("hot").unwrap().impressions, 2000);
        assert_eq!(tracker.frequency_bucket_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_capped_impressions_respect_limit() {
        let tracker = Arc::new(tracker_at(Arc::new(ManualClock::new(T0))));

        let mut handles = Vec::new();
        for i in 0..16 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                tracker.try_record_impression(&format!("ad-{}", i), "banner")
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, DEFAULT_MAX_PER_HOUR);
        let total: u64 = tracker.all_analytics().values().map(|a| a.impressions).sum();
        assert_eq!(total, u64::from(DEFAULT_MAX_PER_HOUR));
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new(T0));
        let tracker = Arc::new(tracker_at(clock.clone()));
        tracker.record_ad_impression("a", "banner");
        clock.advance(HOUR_MS * 3);

        let (tx, rx) = watch::channel(false);
        let handle = spawn_cleanup_task(Arc::clone(&tracker), Duration::from_millis(10), rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.frequency_bucket_count(), 0);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
