//! Overpass client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Public Overpass interpreter.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Default user agent for Overpass requests.
pub const DEFAULT_USER_AGENT: &str = "osm-layers/0.1";

/// Server-side evaluation limit placed in every query header, in seconds.
const DEFAULT_SERVER_TIMEOUT_SECS: u32 = 180;

/// Process-wide query behaviour toggled by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    /// Serve repeated queries from the on-disk cache.
    pub use_cache: bool,
    /// Log each request at `info` rather than `debug`.
    pub verbose_logging: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            use_cache: true,
            verbose_logging: false,
        }
    }
}

/// Configuration for [`OverpassClient`](super::OverpassClient).
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    /// Interpreter URL.
    pub endpoint: String,
    /// User agent string for requests.
    pub user_agent: String,
    /// Client-side request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// `[timeout:n]` value sent to the server.
    pub server_timeout_secs: u32,
    /// Directory holding cached responses.
    pub cache_dir: PathBuf,
    /// Cache and logging switches.
    pub settings: QuerySettings,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: None,
            server_timeout_secs: DEFAULT_SERVER_TIMEOUT_SECS,
            cache_dir: PathBuf::from("cache"),
            settings: QuerySettings::default(),
        }
    }
}

impl OverpassConfig {
    /// Create a configuration for the given interpreter URL.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the client-side request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the response cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Replace the cache and logging switches.
    #[must_use]
    pub const fn with_settings(mut self, settings: QuerySettings) -> Self {
        self.settings = settings;
        self
    }
}
