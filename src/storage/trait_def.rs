use crate::ads::AnalyticsEvent;
use anyhow::Result;
use async_trait::async_trait;

/// Selection applied when reading events back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Only events at or after this epoch-millisecond timestamp
    pub since_ms: i64,
    pub ad_id: Option<String>,
    pub ad_type: Option<String>,
}

impl EventFilter {
    pub fn since(since_ms: i64) -> Self {
        Self {
            since_ms,
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        event.timestamp >= self.since_ms
            && self.ad_id.as_deref().map_or(true, |id| event.ad_id == id)
            && self.ad_type.as_deref().map_or(true, |t| event.ad_type == t)
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    /// Append one ingested event
    async fn insert(&self, event: &AnalyticsEvent) -> Result<()>;

    /// Events matching `filter`, in insertion order
    async fn query(&self, filter: &EventFilter) -> Result<Vec<AnalyticsEvent>>;
}
