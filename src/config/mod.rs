use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ads::DEFAULT_MAX_PER_HOUR;
use crate::sink::dispatcher::DEFAULT_QUEUE_CAPACITY;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub api_server: ServerConfig,
    pub tracker: TrackerConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Impressions allowed per ad type per clock hour
    pub max_per_hour: u32,
    pub probe_delay_ms: u64,
    /// How often stale frequency buckets are swept
    pub cleanup_interval_secs: u64,
    /// Ingestion endpoint the event dispatcher posts to
    pub sink_url: String,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub script_url: String,
    /// Publisher id sent with every placement
    pub client: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_per_hour: DEFAULT_MAX_PER_HOUR,
            probe_delay_ms: 100,
            cleanup_interval_secs: 600,
            sink_url: "http://127.0.0.1:8080/api/analytics".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl TrackerConfig {
    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            script_url: "https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js"
                .to_string(),
            client: "ca-pub-YOUR_PUBLISHER_ID".to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional numeric variable, falling back on absent or bad values
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("Invalid value '{raw}' for {key}, using default");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend = match env_or("EVENT_STORE", "memory").to_lowercase().as_str() {
            "sqlite" => StoreBackend::Sqlite,
            "memory" => StoreBackend::Memory,
            other => {
                tracing::warn!(
                    "Unknown EVENT_STORE '{other}', falling back to 'memory'. Supported values: memory, sqlite"
                );
                StoreBackend::Memory
            }
        };

        let store_url = env_or("DATABASE_URL", "sqlite://./adpulse.db?mode=rwc");
        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 5u32);

        let api_host = env_or("API_HOST", "127.0.0.1");
        let api_port = env_or("API_PORT", "8080").parse::<u16>()?;

        let defaults = TrackerConfig::default();
        let mut max_per_hour = env_parse("AD_MAX_PER_HOUR", defaults.max_per_hour);
        if max_per_hour == 0 {
            tracing::warn!("AD_MAX_PER_HOUR must be positive, using default");
            max_per_hour = defaults.max_per_hour;
        }

        let tracker = TrackerConfig {
            max_per_hour,
            probe_delay_ms: env_parse("AD_PROBE_DELAY_MS", defaults.probe_delay_ms),
            cleanup_interval_secs: env_parse(
                "AD_CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
            ),
            sink_url: env_or("ANALYTICS_SINK_URL", &defaults.sink_url),
            queue_capacity: env_parse("ANALYTICS_QUEUE_CAPACITY", defaults.queue_capacity),
        };

        let provider_defaults = ProviderConfig::default();
        let provider = ProviderConfig {
            script_url: env_or("AD_PROVIDER_SCRIPT_URL", &provider_defaults.script_url),
            client: env_or("AD_PROVIDER_CLIENT", &provider_defaults.client),
        };

        Ok(Config {
            store: StoreConfig {
                backend,
                url: store_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            tracker,
            provider,
        })
    }
}
