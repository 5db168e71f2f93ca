//! Delivery of analytics events to the ingestion endpoint

pub mod dispatcher;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::ads::AnalyticsEvent;

pub use dispatcher::{DispatchStats, EventDispatcher};
pub use http::HttpEventSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("analytics endpoint returned status {0}")]
    Status(u16),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: &AnalyticsEvent) -> Result<(), SinkError>;
}
