use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::ads::Clock;
use crate::storage::EventStore;

pub struct AppState {
    pub store: Arc<dyn EventStore>,
    /// Stamps ingested events and anchors query windows
    pub clock: Arc<dyn Clock>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessFlag {
    pub success: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
