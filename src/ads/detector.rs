//! Ad-block detection
//!
//! Detection is a best-effort signal, not ground truth. The tracker only
//! sees the [`BlockDetector`] trait, so the bait heuristic can be swapped
//! for a fixed answer on hosts without a document or in tests.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Class name content blockers are known to hide
pub const BAIT_CLASS: &str = "adsbox";

/// Default wait between inserting the bait and measuring it
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_millis(100);

#[async_trait]
pub trait BlockDetector: Send + Sync {
    /// Returns `true` when content blocking appears to be active
    async fn probe(&self) -> Result<bool>;
}

/// Document operations needed by the bait heuristic
pub trait BaitHost: Send + Sync {
    type Bait: Send;

    /// Insert an off-screen element carrying `class_name`
    fn insert_bait(&self, class_name: &str) -> Result<Self::Bait>;

    /// Rendered height of the element in CSS pixels
    fn bait_height(&self, bait: &Self::Bait) -> Result<f64>;

    fn remove_bait(&self, bait: Self::Bait) -> Result<()>;
}

/// Bait-element heuristic: blockers collapse elements named like ads
pub struct BaitDetector<H> {
    host: H,
    delay: Duration,
}

impl<H: BaitHost> BaitDetector<H> {
    pub fn new(host: H) -> Self {
        Self::with_delay(host, DEFAULT_PROBE_DELAY)
    }

    pub fn with_delay(host: H, delay: Duration) -> Self {
        Self { host, delay }
    }
}

#[async_trait]
impl<H: BaitHost> BlockDetector for BaitDetector<H> {
    async fn probe(&self) -> Result<bool> {
        let bait = self.host.insert_bait(BAIT_CLASS)?;

        tokio::time::sleep(self.delay).await;

        let height = self.host.bait_height(&bait);

        // The bait is removed whatever the measurement said
        if let Err(e) = self.host.remove_bait(bait) {
            warn!("Failed to remove ad-block bait element: {}", e);
            return Ok(false);
        }

        let height = height?;
        debug!(height, "Ad-block bait measured");
        Ok(height == 0.0)
    }
}

/// Detector with a fixed answer
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDetector {
    blocked: bool,
}

impl StaticDetector {
    pub fn new(blocked: bool) -> Self {
        Self { blocked }
    }
}

#[async_trait]
impl BlockDetector for StaticDetector {
    async fn probe(&self) -> Result<bool> {
        Ok(self.blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDocument {
        height: f64,
        fail_measure: bool,
        fail_remove: bool,
        live: Mutex<Vec<u32>>,
        next_id: Mutex<u32>,
    }

    impl BaitHost for FakeDocument {
        type Bait = u32;

        fn insert_bait(&self, class_name: &str) -> Result<u32> {
            assert_eq!(class_name, BAIT_CLASS);
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            self.live.lock().unwrap().push(*next);
            Ok(*next)
        }

        fn bait_height(&self, _bait: &u32) -> Result<f64> {
            if self.fail_measure {
                anyhow::bail!("layout unavailable");
            }
            Ok(self.height)
        }

        fn remove_bait(&self, bait: u32) -> Result<()> {
            if self.fail_remove {
                anyhow::bail!("element detached");
            }
            self.live.lock().unwrap().retain(|id| *id != bait);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_collapsed_bait_means_blocked() {
        let detector = BaitDetector::with_delay(FakeDocument::default(), Duration::ZERO);
        assert!(detector.probe().await.unwrap());
        assert!(detector.host.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_visible_bait_means_not_blocked() {
        let host = FakeDocument {
            height: 18.0,
            ..Default::default()
        };
        let detector = BaitDetector::with_delay(host, Duration::ZERO);
        assert!(!detector.probe().await.unwrap());
    }

    #[tokio::test]
    async fn test_bait_removed_when_measurement_fails() {
        let host = FakeDocument {
            fail_measure: true,
            ..Default::default()
        };
        let detector = BaitDetector::with_delay(host, Duration::ZERO);
        assert!(detector.probe().await.is_err());
        assert!(detector.host.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removal_failure_reports_not_blocked() {
        let host = FakeDocument {
            fail_remove: true,
            ..Default::default()
        };
        let detector = BaitDetector::with_delay(host, Duration::ZERO);
        assert!(!detector.probe().await.unwrap());
    }
}
