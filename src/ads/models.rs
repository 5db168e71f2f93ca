//! Data models for ad placements and analytics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds in one frequency window
pub const HOUR_MS: i64 = 3_600_000;

/// Layout hint passed to the ad provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdFormat {
    #[default]
    Auto,
    Horizontal,
    Vertical,
    Rectangle,
}

impl AdFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdFormat::Auto => "auto",
            AdFormat::Horizontal => "horizontal",
            AdFormat::Vertical => "vertical",
            AdFormat::Rectangle => "rectangle",
        }
    }
}

/// A single ad placement as defined in static configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdConfig {
    /// Opaque placement identifier (e.g., "top-banner-ad")
    pub id: String,

    /// Display size such as "728x90"
    pub size: String,

    /// Provider slot token
    pub slot: String,

    #[serde(default)]
    pub format: AdFormat,

    #[serde(default)]
    pub responsive: bool,
}

/// Per-ad accumulator kept in process memory
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdAnalytics {
    pub impressions: u64,
    pub clicks: u64,
    /// Not tracked locally; always zero
    pub revenue: f64,
    /// Click-through rate as a percentage
    pub ctr: f64,
}

impl AdAnalytics {
    /// Recompute the click-through rate from the current counters.
    ///
    /// Zero impressions yields a CTR of zero rather than NaN or infinity.
    pub fn recompute_ctr(&mut self) {
        self.ctr = ctr_percent(self.impressions, self.clicks);
    }
}

/// Clicks over impressions as a percentage, 0 when nothing was shown
pub fn ctr_percent(impressions: u64, clicks: u64) -> f64 {
    if impressions == 0 {
        0.0
    } else {
        clicks as f64 / impressions as f64 * 100.0
    }
}

/// Frequency bucket key: one counter per ad type per clock hour
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FrequencyKey {
    pub ad_type: String,

    /// `floor(epoch_ms / HOUR_MS)`
    pub hour_epoch: i64,
}

impl FrequencyKey {
    pub fn new(ad_type: &str, now_ms: i64) -> Self {
        Self {
            ad_type: ad_type.to_string(),
            hour_epoch: now_ms.div_euclid(HOUR_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Impression,
    Click,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Impression => "impression",
            EventKind::Click => "click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind '{0}'")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "impression" => Ok(EventKind::Impression),
            "click" => Ok(EventKind::Click),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// Client-side context stamped into every emitted event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub user_agent: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_size: Option<String>,
}

/// Write-once record sent to the analytics sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event: EventKind,
    pub ad_id: String,
    pub ad_type: String,

    /// Epoch milliseconds
    pub timestamp: i64,

    pub user_agent: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_size: Option<String>,
}

impl AnalyticsEvent {
    pub fn new(
        event: EventKind,
        ad_id: &str,
        ad_type: &str,
        timestamp: i64,
        context: &ClientContext,
    ) -> Self {
        Self {
            event,
            ad_id: ad_id.to_string(),
            ad_type: ad_type.to_string(),
            timestamp,
            user_agent: context.user_agent.clone(),
            url: context.url.clone(),
            referrer: context.referrer.clone(),
            screen_resolution: context.screen_resolution.clone(),
            viewport_size: context.viewport_size.clone(),
        }
    }
}
