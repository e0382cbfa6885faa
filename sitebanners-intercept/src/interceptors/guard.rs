//! Protected-record guard for deletes.

use crate::{
    Call, CallContext, Interceptor, Next, Operation, Outcome, RepositoryError, RepositoryResult,
};
use async_trait::async_trait;
use sitebanners_types::Banner;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, warn};

pub const DEFAULT_PROTECTED_SORT_ORDER: i32 = 10;

/// Around `delete` and `delete_by_id`.
///
/// A banner with `sort_order` below the threshold is protected: the guard
/// fails with `OperationBlocked` and never proceeds. `delete_by_id` resolves
/// the banner through the dispatcher first (cache included) to decide.
pub struct DeleteGuard {
    threshold: i32,
    blocked: AtomicU64,
}

impl DeleteGuard {
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold,
            blocked: AtomicU64::new(0),
        }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn is_protected(&self, banner: &Banner) -> bool {
        banner.sort_order < self.threshold
    }

    /// Number of deletes refused so far.
    pub fn blocked_count(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    fn check(&self, banner: &Banner) -> RepositoryResult<()> {
        let Some(id) = banner.id else {
            return Ok(());
        };
        if !self.is_protected(banner) {
            info!(
                banner_id = %id,
                title = %banner.title,
                sort_order = banner.sort_order,
                action = "delete_approved",
                "[CIRCUIT BREAKER] APPROVED deletion of banner"
            );
            return Ok(());
        }
        self.blocked.fetch_add(1, Ordering::Relaxed);
        warn!(
            banner_id = %id,
            title = %banner.title,
            sort_order = banner.sort_order,
            threshold = self.threshold,
            action = "delete_blocked",
            "[CIRCUIT BREAKER] BLOCKED deletion of protected banner"
        );
        Err(RepositoryError::OperationBlocked {
            id,
            title: banner.title.clone(),
            sort_order: banner.sort_order,
            threshold: self.threshold,
        })
    }
}

impl Default for DeleteGuard {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_SORT_ORDER)
    }
}

#[async_trait]
impl Interceptor for DeleteGuard {
    fn name(&self) -> &str {
        "delete_guard"
    }

    async fn around(&self, ctx: &CallContext, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        let operation = call.operation();
        match &call {
            Call::Delete(banner) => self.check(banner)?,
            Call::DeleteById(id) => {
                let banner = next.subject().get_by_id(ctx, *id).await?;
                self.check(&banner)?;
            }
            _ => {}
        }
        if !matches!(operation, Operation::Delete | Operation::DeleteById) {
            return next.run(call).await;
        }

        let id = call.banner_id();
        match next.run(call).await {
            Ok(Outcome::Deleted(true)) => {
                info!(banner_id = ?id, %operation, "[CIRCUIT BREAKER] Banner deleted after approval");
                Ok(Outcome::Deleted(true))
            }
            Ok(other) => Ok(other),
            Err(e) => {
                error!(banner_id = ?id, %operation, error = %e, "[CIRCUIT BREAKER] Unexpected error during delete");
                Err(e)
            }
        }
    }
}
