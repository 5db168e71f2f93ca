use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use super::DisplayError;
use crate::ads::AdConfig;

/// Page-side operations of the third-party ad provider
#[async_trait]
pub trait ProviderHost: Send + Sync {
    /// Inject the provider script and wait for it to load
    async fn inject_script(&self, src: &str) -> Result<(), DisplayError>;

    /// Queue a placement request on the provider's global request array
    fn push_placement(&self, client: &str, config: &AdConfig) -> Result<(), DisplayError>;
}

/// Process-wide handle to the provider script.
///
/// Every display unit on a page shares one of these; the script is injected
/// the first time any unit needs it and never again. A failed injection
/// leaves the handle unloaded so a later unit may try again.
pub struct ProviderScript {
    src: String,
    client: String,
    loaded: OnceCell<()>,
}

impl ProviderScript {
    pub fn new(src: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            client: client.into(),
            loaded: OnceCell::new(),
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    /// Publisher id passed with every placement
    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    pub async fn ensure_loaded(&self, host: &dyn ProviderHost) -> Result<(), DisplayError> {
        self.loaded
            .get_or_try_init(|| async {
                info!(src = %self.src, "Injecting ad provider script");
                host.inject_script(&self.src).await
            })
            .await?;
        Ok(())
    }
}
