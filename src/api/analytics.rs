//! Analytics ingestion and query handlers

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::handlers::{AppState, ErrorResponse, SuccessFlag};
use crate::ads::{AnalyticsEvent, AnalyticsSummary, EventKind, TimeRange};
use crate::storage::EventFilter;

/// Body of `POST /api/analytics`.
///
/// Fields are optional here so that missing values produce a 400 with the
/// same error body as empty ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub event: Option<String>,
    pub ad_id: Option<String>,
    pub ad_type: Option<String>,
    /// Client clock; replaced by the server's on ingest
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub url: String,
    pub referrer: Option<String>,
    pub screen_resolution: Option<String>,
    pub viewport_size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQueryParams {
    pub ad_id: Option<String>,
    pub ad_type: Option<String>,
    #[serde(default)]
    pub time_range: TimeRange,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Record one impression or click event
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<SuccessFlag>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::warn!("Rejected analytics payload: {}", e);
        bad_request("Invalid request body")
    })?;

    let (Some(event), Some(ad_id), Some(ad_type)) = (
        required(payload.event),
        required(payload.ad_id),
        required(payload.ad_type),
    ) else {
        return Err(bad_request("Missing required fields"));
    };

    let kind = event
        .parse::<EventKind>()
        .map_err(|e| bad_request(&e.to_string()))?;

    let record = AnalyticsEvent {
        event: kind,
        ad_id,
        ad_type,
        timestamp: state.clock.now_ms(),
        user_agent: payload.user_agent,
        url: payload.url,
        referrer: payload.referrer,
        screen_resolution: payload.screen_resolution,
        viewport_size: payload.viewport_size,
    };

    if let Err(e) = state.store.insert(&record).await {
        tracing::error!("Failed to store analytics event: {:#}", e);
        return Err(internal_error());
    }

    tracing::info!(
        ad_id = %record.ad_id,
        ad_type = %record.ad_type,
        "Ad {}",
        record.event
    );

    Ok(Json(SuccessFlag { success: true }))
}

/// Aggregate statistics over a time window
pub async fn query_analytics(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AnalyticsQueryParams>, QueryRejection>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let Query(params) = params.map_err(|e| {
        tracing::warn!("Rejected analytics query: {}", e);
        bad_request("Invalid query parameters")
    })?;

    let filter = EventFilter {
        since_ms: params.time_range.since(state.clock.now_ms()),
        ad_id: required(params.ad_id),
        ad_type: required(params.ad_type),
    };

    match state.store.query(&filter).await {
        Ok(events) => Ok(Json(AnalyticsSummary::from_events(events))),
        Err(e) => {
            tracing::error!("Failed to query analytics: {:#}", e);
            Err(internal_error())
        }
    }
}
