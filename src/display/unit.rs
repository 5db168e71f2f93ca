use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::provider::{ProviderHost, ProviderScript};
use super::viewport::{IntersectionEntry, ViewportTrigger};
use super::DisplayError;
use crate::ads::{AdConfig, AdFormat, AdTracker};

pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "Support our site: please consider disabling your ad blocker so we can keep improving.";

pub const DEFAULT_FAILURE_MESSAGE: &str = "Ad failed to load.";

/// Why a placement settled on its fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    AdBlocker,
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdState {
    Idle,
    Loading,
    Loaded,
    Blocked(BlockReason),
    Error(String),
}

impl AdState {
    /// Both block reasons share one fallback at the UI layer
    pub fn is_blocked(&self) -> bool {
        matches!(self, AdState::Blocked(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AdState::Loaded | AdState::Blocked(_) | AdState::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The unit reached a terminal state
    Settled(AdState),
    /// `load` was called outside `Loading`
    Skipped,
    /// The unit was unmounted while loading; no state was applied
    Abandoned,
}

/// Attributes of a live placement element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePlacement {
    pub client: String,
    pub slot: String,
    pub format: AdFormat,
    pub full_width_responsive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Placeholder,
    Live(LivePlacement),
    Fallback(String),
    Failure(String),
}

/// Lets another task unmount a unit whose load is in flight
#[derive(Debug, Clone)]
pub struct MountHandle(Arc<AtomicBool>);

impl MountHandle {
    pub fn unmount(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct LazyAdUnit {
    config: AdConfig,
    ad_type: String,
    fallback: Option<String>,
    tracker: Arc<AdTracker>,
    script: Arc<ProviderScript>,
    host: Arc<dyn ProviderHost>,
    trigger: ViewportTrigger,
    state: AdState,
    mounted: MountHandle,
    impression_recorded: bool,
}

impl LazyAdUnit {
    pub fn new(
        config: AdConfig,
        ad_type: impl Into<String>,
        tracker: Arc<AdTracker>,
        script: Arc<ProviderScript>,
        host: Arc<dyn ProviderHost>,
    ) -> Self {
        Self {
            config,
            ad_type: ad_type.into(),
            fallback: None,
            tracker,
            script,
            host,
            trigger: ViewportTrigger::default(),
            state: AdState::Idle,
            mounted: MountHandle(Arc::new(AtomicBool::new(true))),
            impression_recorded: false,
        }
    }

    /// Content shown instead of the default support message when blocked
    pub fn with_fallback(mut self, content: impl Into<String>) -> Self {
        self.fallback = Some(content.into());
        self
    }

    pub fn with_trigger(mut self, trigger: ViewportTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn state(&self) -> &AdState {
        &self.state
    }

    pub fn config(&self) -> &AdConfig {
        &self.config
    }

    pub fn mount_handle(&self) -> MountHandle {
        self.mounted.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_mounted()
    }

    /// Tear down the viewport observer and ignore any load still in flight
    pub fn unmount(&mut self) {
        self.mounted.unmount();
        self.trigger.disconnect();
    }

    /// Feed a viewport observation. Returns `true` when this observation
    /// moved the unit from `Idle` to `Loading`.
    pub fn observe(&mut self, entry: IntersectionEntry) -> bool {
        if !self.is_mounted() {
            self.trigger.disconnect();
            return false;
        }
        if self.state != AdState::Idle {
            return false;
        }

        if self.trigger.observe(entry) {
            debug!(ad_id = %self.config.id, "Placement entered viewport");
            self.state = AdState::Loading;
            return true;
        }
        false
    }

    /// Run the load sequence. Only acts in `Loading`.
    ///
    /// The ad-block probe result is process-wide and is kept on the tracker
    /// even if the unit is unmounted while probing. Impressions are only
    /// recorded by a unit that is still mounted.
    pub async fn load(&mut self) -> LoadOutcome {
        if self.state != AdState::Loading {
            return LoadOutcome::Skipped;
        }

        if let Err(e) = self.validate() {
            warn!(ad_id = %self.config.id, "{}", e);
            return self.settle(AdState::Error(e.to_string()));
        }

        let blocked = self.tracker.detect_ad_block().await;
        if !self.is_mounted() {
            return self.abandon();
        }
        if blocked {
            info!(ad_id = %self.config.id, "Ad blocker detected, showing fallback");
            return self.settle(AdState::Blocked(BlockReason::AdBlocker));
        }

        if !self.tracker.can_show_ad(&self.ad_type) {
            info!(ad_id = %self.config.id, ad_type = %self.ad_type, "Hourly ad limit reached, showing fallback");
            return self.settle(AdState::Blocked(BlockReason::RateLimited));
        }

        let loaded = self.script.ensure_loaded(self.host.as_ref()).await;
        if !self.is_mounted() {
            return self.abandon();
        }
        if let Err(e) = loaded {
            warn!(ad_id = %self.config.id, "{}", e);
            return self.settle(AdState::Error(e.to_string()));
        }

        if let Err(e) = self.host.push_placement(self.script.client(), &self.config) {
            warn!(ad_id = %self.config.id, "{}", e);
            return self.settle(AdState::Error(e.to_string()));
        }

        // Units of the same type may have passed the first check while the
        // script was loading; the cap is enforced again atomically here.
        if !self.impression_recorded {
            if !self
                .tracker
                .try_record_impression(&self.config.id, &self.ad_type)
            {
                info!(ad_id = %self.config.id, ad_type = %self.ad_type, "Hourly ad limit reached while loading, showing fallback");
                return self.settle(AdState::Blocked(BlockReason::RateLimited));
            }
            self.impression_recorded = true;
        }

        self.settle(AdState::Loaded)
    }

    /// Record one click on the live placement. Ignored unless loaded.
    pub fn click(&self) -> bool {
        if self.state != AdState::Loaded || !self.is_mounted() {
            return false;
        }
        self.tracker.record_ad_click(&self.config.id, &self.ad_type);
        true
    }

    pub fn render(&self) -> Rendered {
        match &self.state {
            AdState::Idle | AdState::Loading => Rendered::Placeholder,
            AdState::Loaded => Rendered::Live(LivePlacement {
                client: self.script.client().to_string(),
                slot: self.config.slot.clone(),
                format: self.config.format,
                full_width_responsive: self.config.responsive,
            }),
            AdState::Blocked(_) => Rendered::Fallback(
                self.fallback
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FALLBACK_MESSAGE.to_string()),
            ),
            AdState::Error(_) => Rendered::Failure(DEFAULT_FAILURE_MESSAGE.to_string()),
        }
    }

    fn validate(&self) -> Result<(), DisplayError> {
        if self.config.id.trim().is_empty() {
            return Err(DisplayError::InvalidConfig("missing ad id".to_string()));
        }
        if self.config.slot.trim().is_empty() {
            return Err(DisplayError::InvalidConfig("missing slot".to_string()));
        }
        if self.ad_type.trim().is_empty() {
            return Err(DisplayError::InvalidConfig("missing ad type".to_string()));
        }
        Ok(())
    }

    fn settle(&mut self, state: AdState) -> LoadOutcome {
        self.state = state.clone();
        LoadOutcome::Settled(state)
    }

    fn abandon(&mut self) -> LoadOutcome {
        debug!(ad_id = %self.config.id, "Placement unmounted during load");
        self.trigger.disconnect();
        LoadOutcome::Abandoned
    }
}
