//! Repository configuration, read from `sitebanners.toml`.
//!
//! Every interceptor has its own section with `enabled` and `order` (lower
//! runs first and wraps everything with a higher order). Missing sections and
//! keys take their defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! [store]
//! timeout_ms = 5000
//!
//! [guard]
//! order = 5
//! protected_below = 10
//!
//! [retry]
//! enabled = true
//! max_attempts = 3
//! ```

use serde::{Deserialize, Serialize};
use sitebanners_intercept::interceptors::{
    DEFAULT_AUDIT_CAPACITY, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROTECTED_SORT_ORDER,
    DEFAULT_SLOW_QUERY_THRESHOLD,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "sitebanners.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Per-call deadline for store access. `0` disables it.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub order: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub enabled: bool,
    pub order: i32,
    pub slow_query_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: 20,
            slow_query_ms: DEFAULT_SLOW_QUERY_THRESHOLD.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub enabled: bool,
    pub order: i32,
    /// Banners with a sort order below this cannot be deleted.
    pub protected_below: i32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: 5,
            protected_below: DEFAULT_PROTECTED_SORT_ORDER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub enabled: bool,
    pub order: i32,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub order: i32,
    /// Records kept in memory; the oldest are dropped first.
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: 40,
            capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub enabled: bool,
    pub order: i32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    pub order: i32,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            order: 15,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF.as_millis() as u64,
        }
    }
}

/// Which interceptors to install, in what order, with what settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub latency: LatencyConfig,
    pub guard: GuardConfig,
    pub sanitizer: SanitizerConfig,
    pub audit: AuditConfig,
    pub enhancer: EnhancerConfig,
    pub retry: RetryConfig,
}

impl RepositoryConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a config file, failing on any problem.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads a config file, falling back to defaults.
    ///
    /// A missing file is normal and logged at `info`; an unreadable or
    /// invalid one is logged at `warn`.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => {
                info!("Loaded repository config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Failed to load config file {:?}: {}. Falling back to defaults.", path, e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.audit.capacity == 0 {
            return Err(ConfigError::Invalid("audit.capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
