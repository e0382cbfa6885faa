//! Repository facade for SiteBanners.
//!
//! [`BannerRepository`] is what applications talk to. It owns a
//! [`Dispatcher`](sitebanners_intercept::Dispatcher) wired from a
//! [`RepositoryConfig`], so every call passes through the configured
//! interceptors (cache, latency monitor, delete guard, title sanitizer,
//! audit log, result enhancer and, when enabled, retry) before it reaches
//! the store.
//!
//! The facade also carries the storefront helpers (`active_banners`,
//! `banner_count`, `find_banner`, `statistics`), bulk admin actions and
//! the sample content used by demos.

mod config;
mod repository;
mod samples;

pub use config::{
    AuditConfig, CacheConfig, ConfigError, DEFAULT_CONFIG_FILE, EnhancerConfig, GuardConfig,
    LatencyConfig, RepositoryConfig, RetryConfig, SanitizerConfig, StoreConfig,
};
pub use repository::{BannerRepository, MassActionReport};
pub use samples::sample_banners;
pub use sitebanners_intercept::{CallContext, Operation, RepositoryError, RepositoryResult};
