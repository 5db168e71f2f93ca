//! Ad frequency capping, block detection and local analytics
//!
//! The tracker is the single authority every display unit consults before
//! rendering, and the single source of impression/click events.

pub mod clock;
pub mod detector;
pub mod models;
pub mod placements;
pub mod report;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use detector::{BaitDetector, BaitHost, BlockDetector, StaticDetector};
pub use models::{
    AdAnalytics, AdConfig, AdFormat, AnalyticsEvent, ClientContext, EventKind, FrequencyKey,
};
pub use placements::{default_placements, placement_by_key};
pub use report::{AdPerformance, AnalyticsSummary, TimeRange};
pub use tracker::{spawn_cleanup_task, AdTracker, DEFAULT_MAX_PER_HOUR};
