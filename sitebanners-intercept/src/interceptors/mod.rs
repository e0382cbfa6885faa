//! Stock interceptors.

mod audit;
mod cache;
mod enhancer;
mod guard;
mod latency;
mod retry;
mod sanitizer;

pub use audit::{AuditAction, AuditLog, AuditRecord, AuditStatus, DEFAULT_AUDIT_CAPACITY};
pub use cache::{CacheLayer, CacheStats};
pub use enhancer::ResultEnhancer;
pub use guard::{DEFAULT_PROTECTED_SORT_ORDER, DeleteGuard};
pub use latency::{DEFAULT_SLOW_QUERY_THRESHOLD, LatencyMonitor, LatencyStats};
pub use retry::{DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, RetryTransient};
pub use sanitizer::{TitleSanitizer, sanitize_title};
