//! App state: backing store, cache, service, metrics, config.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use roster_cache::{CacheConfig, CacheStore};
use roster_core::constants::{DEFAULT_CACHE_TTL, DEFAULT_SERVICE_PORT};
use roster_core::error::{Result, RosterError};
use roster_core::traits::RecordProvider;
use roster_core::types::User;
use roster_registry::{FileStore, MemoryStore};

use crate::metrics::ApiMetrics;
use crate::service::UserService;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind
    pub bind_addr: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Cache TTL
    pub cache_ttl: Duration,
    /// JSON record file; in-memory storage when absent
    pub data_file: Option<PathBuf>,
    /// Default log filter
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_SERVICE_PORT,
            cache_ttl: DEFAULT_CACHE_TTL,
            data_file: None,
            log_level: "info".into(),
        }
    }
}

impl ApiConfig {
    /// Reads configuration from the process environment.
    ///
    /// Does not load `.env`; the binary does that once at startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            port: env_or("SERVICE_PORT", defaults.port),
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", defaults.cache_ttl.as_secs())),
            data_file: std::env::var("DATA_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Socket address built from `bind_addr` and `port`.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    /// Configuration the state was built from
    pub config: ApiConfig,
    /// User use-case layer
    pub users: UserService,
    /// Read-through cache in front of the backing store
    pub cache: Arc<CacheStore<User>>,
    /// Prometheus metrics
    pub metrics: Arc<ApiMetrics>,
    /// When the state was built; health reports uptime from here
    pub started_at: Instant,
}

impl AppState {
    /// Opens the configured backing store and builds the cache in front of it.
    pub async fn from_config(config: ApiConfig) -> Result<Self> {
        let provider: Arc<dyn RecordProvider<User>> = match &config.data_file {
            Some(path) => {
                info!(path = ?path, "Using file-backed user store");
                Arc::new(FileStore::<User>::open(path).await?)
            }
            None => {
                info!("Using in-memory user store");
                Arc::new(MemoryStore::<User>::new())
            }
        };
        Self::with_provider(config, provider)
    }

    /// Builds state over an in-memory store, ignoring `data_file`.
    pub fn in_memory(config: ApiConfig) -> Result<Self> {
        Self::with_provider(config, Arc::new(MemoryStore::<User>::new()))
    }

    /// Builds state over any backing provider.
    pub fn with_provider(config: ApiConfig, provider: Arc<dyn RecordProvider<User>>) -> Result<Self> {
        let metrics = Arc::new(
            ApiMetrics::new()
                .map_err(|e| RosterError::Config(format!("failed to register metrics: {}", e)))?,
        );

        let cache = Arc::new(CacheStore::with_metrics(
            provider,
            CacheConfig::new(config.cache_ttl),
            metrics.clone(),
        )?);

        info!(ttl_secs = config.cache_ttl.as_secs(), "User cache ready");

        Ok(Self {
            users: UserService::new(cache.clone()),
            config,
            cache,
            metrics,
            started_at: Instant::now(),
        })
    }
}
