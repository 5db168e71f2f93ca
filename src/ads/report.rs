//! Aggregate statistics over stored analytics events

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::models::{ctr_percent, AnalyticsEvent, EventKind};

/// Mock revenue credited per click
const REVENUE_PER_CLICK: f64 = 0.01;

/// Query window for aggregate statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl TimeRange {
    pub fn duration_ms(&self) -> i64 {
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        match self {
            TimeRange::Day => DAY_MS,
            TimeRange::Week => 7 * DAY_MS,
            TimeRange::Month => 30 * DAY_MS,
        }
    }

    /// Earliest timestamp inside the window ending at `now_ms`
    pub fn since(&self, now_ms: i64) -> i64 {
        now_ms - self.duration_ms()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPerformance {
    pub ad_id: String,
    pub ad_type: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub data: Vec<AnalyticsEvent>,
    pub ad_performance: Vec<AdPerformance>,
}

impl AnalyticsSummary {
    /// Totals plus a per-ad breakdown. Ads appear in order of their first event.
    pub fn from_events(events: Vec<AnalyticsEvent>) -> Self {
        let ad_performance: Vec<AdPerformance> = {
            let mut order: Vec<&str> = Vec::new();
            let mut per_ad: HashMap<&str, AdPerformance> = HashMap::new();

            for event in &events {
                let perf = per_ad.entry(event.ad_id.as_str()).or_insert_with(|| {
                    order.push(event.ad_id.as_str());
                    AdPerformance {
                        ad_id: event.ad_id.clone(),
                        ad_type: event.ad_type.clone(),
                        impressions: 0,
                        clicks: 0,
                        ctr: 0.0,
                        revenue: 0.0,
                    }
                });
                match event.event {
                    EventKind::Impression => perf.impressions += 1,
                    EventKind::Click => perf.clicks += 1,
                }
            }

            order
                .iter()
                .filter_map(|id| per_ad.remove(id))
                .map(|mut perf| {
                    perf.ctr = round2(ctr_percent(perf.impressions, perf.clicks));
                    perf.revenue = round2(perf.clicks as f64 * REVENUE_PER_CLICK);
                    perf
                })
                .collect()
        };

        let impressions = ad_performance.iter().map(|p| p.impressions).sum();
        let clicks = ad_performance.iter().map(|p| p.clicks).sum();

        Self {
            impressions,
            clicks,
            ctr: round2(ctr_percent(impressions, clicks)),
            data: events,
            ad_performance,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
