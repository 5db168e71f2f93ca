use async_trait::async_trait;
use std::time::Duration;

use super::{EventSink, SinkError};
use crate::ads::AnalyticsEvent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts events as JSON to the analytics ingestion endpoint
pub struct HttpEventSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEventSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn send(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        let response = self.client.post(&self.endpoint).json(event).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }

        Ok(())
    }
}
