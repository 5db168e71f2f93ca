use crate::ads::AnalyticsEvent;
use crate::storage::{EventFilter, EventStore};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local event log; contents are lost on restart
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<AnalyticsEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, event: &AnalyticsEvent) -> Result<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<AnalyticsEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}
