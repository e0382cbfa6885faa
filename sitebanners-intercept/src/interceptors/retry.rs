//! Opt-in retry for reads.

use crate::{
    Call, CallContext, Interceptor, Next, Operation, Outcome, RepositoryError, RepositoryResult,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

/// Around `get_by_id` and `get_list` only: re-runs the rest of the chain
/// when it fails with a transient store error. Writes are never retried.
pub struct RetryTransient {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryTransient {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Waits out the backoff unless the caller cancels first or the
    /// context's deadline falls inside it.
    async fn back_off(&self, ctx: &CallContext, operation: Operation) -> RepositoryResult<()> {
        let wake = Instant::now() + self.backoff;
        let expired = match (ctx.deadline(), ctx.timeout()) {
            (Some(deadline), Some(timeout)) if deadline <= wake => Some((deadline, timeout)),
            _ => None,
        };
        let until = expired.map_or(wake, |(deadline, _)| deadline);

        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(RepositoryError::Cancelled { operation }),
            _ = tokio::time::sleep_until(until) => match expired {
                Some((_, timeout)) => Err(RepositoryError::Timeout {
                    operation,
                    timeout_ms: timeout.as_millis() as u64,
                }),
                None => Ok(()),
            },
        }
    }
}

impl Default for RetryTransient {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

#[async_trait]
impl Interceptor for RetryTransient {
    fn name(&self) -> &str {
        "retry_transient"
    }

    async fn around(&self, ctx: &CallContext, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        let operation = call.operation();
        if !matches!(operation, Operation::GetById | Operation::GetList) {
            return next.run(call).await;
        }

        let mut attempt = 1;
        loop {
            match next.run(call.clone()).await {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        %operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Transient store failure, retrying"
                    );
                    self.back_off(ctx, operation).await?;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
