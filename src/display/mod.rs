//! Lazily loaded ad placements
//!
//! A [`LazyAdUnit`] stays idle until its placement nears the viewport, then
//! consults the shared [`AdTracker`](crate::ads::AdTracker) and either
//! renders the live placement or degrades to fallback content. Nothing in
//! here surfaces an error to the page: every failure becomes a state.

pub mod provider;
pub mod unit;
pub mod viewport;

use thiserror::Error;

pub use provider::{ProviderHost, ProviderScript};
pub use unit::{
    AdState, BlockReason, LazyAdUnit, LivePlacement, LoadOutcome, MountHandle, Rendered,
    DEFAULT_FALLBACK_MESSAGE, DEFAULT_FAILURE_MESSAGE,
};
pub use viewport::{IntersectionEntry, ViewportTrigger};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    #[error("ad provider script failed to load: {0}")]
    ScriptLoad(String),
    #[error("ad placement initialization failed: {0}")]
    Placement(String),
    #[error("invalid ad placement: {0}")]
    InvalidConfig(String),
}
