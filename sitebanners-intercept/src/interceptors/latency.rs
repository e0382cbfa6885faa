//! Timing for `get_list`.

use crate::{Call, CallContext, Interceptor, Next, Outcome, RepositoryResult};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub const DEFAULT_SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    pub queries: u64,
    pub slow_queries: u64,
    pub failures: u64,
}

/// Around `get_list`: logs elapsed time at `info`, or at `warn` when it
/// exceeds the slow-query threshold. Failures are timed too.
pub struct LatencyMonitor {
    slow_threshold: Duration,
    queries: AtomicU64,
    slow_queries: AtomicU64,
    failures: AtomicU64,
}

impl LatencyMonitor {
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            slow_threshold,
            queries: AtomicU64::new(0),
            slow_queries: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    /// Elapsed times equal to the threshold are not slow.
    pub fn is_slow(&self, elapsed: Duration) -> bool {
        elapsed > self.slow_threshold
    }

    pub fn stats(&self) -> LatencyStats {
        LatencyStats {
            queries: self.queries.load(Ordering::Relaxed),
            slow_queries: self.slow_queries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for LatencyMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_SLOW_QUERY_THRESHOLD)
    }
}

#[async_trait]
impl Interceptor for LatencyMonitor {
    fn name(&self) -> &str {
        "latency_monitor"
    }

    async fn around(&self, _ctx: &CallContext, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        let Call::GetList(criteria) = &call else {
            return next.run(call).await;
        };
        let page_size = criteria
            .page_size
            .map_or_else(|| "unlimited".to_string(), |size| size.to_string());
        let current_page = criteria.current_page;
        let filters = criteria.describe_filters();
        let filter_count = criteria.filter_count();

        let started = Instant::now();
        let result = next.run(call).await;
        let elapsed = started.elapsed();
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        self.queries.fetch_add(1, Ordering::Relaxed);

        match &result {
            Ok(outcome) => {
                let result_count = match outcome {
                    Outcome::List(results) => results.total_count,
                    _ => 0,
                };
                if self.is_slow(elapsed) {
                    self.slow_queries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        duration_ms,
                        result_count,
                        current_page,
                        page_size = %page_size,
                        filter_count,
                        filters = %filters,
                        slow_query = true,
                        "[PERFORMANCE] Banner search completed in {:.2} ms [SLOW QUERY DETECTED]",
                        duration_ms
                    );
                } else {
                    info!(
                        duration_ms,
                        result_count,
                        current_page,
                        page_size = %page_size,
                        filter_count,
                        slow_query = false,
                        "[PERFORMANCE] Banner search completed in {:.2} ms",
                        duration_ms
                    );
                }
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    duration_ms,
                    error = %e,
                    "[PERFORMANCE] Banner search FAILED after {:.2} ms",
                    duration_ms
                );
            }
        }
        result
    }
}
