//! Built-in placement catalog

use std::collections::BTreeMap;

use super::models::{AdConfig, AdFormat};

fn placement(id: &str, size: &str, slot: &str, format: AdFormat, responsive: bool) -> AdConfig {
    AdConfig {
        id: id.to_string(),
        size: size.to_string(),
        slot: slot.to_string(),
        format,
        responsive,
    }
}

/// The placements the site ships with, keyed by their layout name.
///
/// Slot tokens are provider placeholders and are expected to be replaced
/// per deployment.
pub fn default_placements() -> BTreeMap<&'static str, AdConfig> {
    use AdFormat::*;

    BTreeMap::from([
        ("topBanner", placement("top-banner-ad", "728x90", "1234567890", Horizontal, true)),
        ("sidebarSquare", placement("sidebar-square-ad", "300x250", "1234567891", Rectangle, false)),
        ("sidebarSkyscraper", placement("sidebar-skyscraper-ad", "160x600", "1234567892", Vertical, false)),
        ("contentAd", placement("content-ad", "728x250", "1234567893", Horizontal, true)),
        ("mobileFloating", placement("mobile-floating-ad", "320x50", "1234567894", Horizontal, true)),
        ("detailPageTop", placement("detail-top-ad", "728x90", "1234567895", Horizontal, true)),
        ("detailPageBottom", placement("detail-bottom-ad", "728x250", "1234567896", Horizontal, true)),
    ])
}

/// Look up a single placement by layout name
pub fn placement_by_key(key: &str) -> Option<AdConfig> {
    default_placements().remove(key)
}
