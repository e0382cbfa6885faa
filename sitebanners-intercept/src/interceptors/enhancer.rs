//! Derived lifecycle data for read and save results.

use crate::{Call, CallContext, Interceptor, Outcome};
use async_trait::async_trait;
use sitebanners_types::{Banner, Clock, ListStatistics, SystemClock};
use std::sync::Arc;
use tracing::info;

/// After `save`, `get_by_id` and `get_list`.
///
/// Single banners are only logged with their display status and days
/// remaining; list results get [`ListStatistics`] attached.
pub struct ResultEnhancer {
    clock: Arc<dyn Clock>,
}

impl ResultEnhancer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn log_banner(&self, call: &Call, banner: &Banner) {
        let now = self.clock.now();
        let status = banner.display_status(now);
        let days_remaining = banner
            .days_remaining(now)
            .map_or_else(|| "N/A".to_string(), |days| days.to_string());
        let context = if matches!(call, Call::Save(_)) {
            "after save"
        } else {
            "after fetch"
        };
        info!(
            banner_id = ?banner.id,
            display_status = %status,
            days_remaining = %days_remaining,
            is_active = banner.is_active,
            "Banner data enhanced {} - Title: \"{}\", Status: {}, Days Remaining: {}",
            context,
            banner.title,
            status,
            days_remaining
        );
    }
}

impl Default for ResultEnhancer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl Interceptor for ResultEnhancer {
    fn name(&self) -> &str {
        "result_enhancer"
    }

    async fn after(&self, _ctx: &CallContext, call: &Call, outcome: &mut Outcome) -> anyhow::Result<()> {
        match outcome {
            Outcome::Banner(banner) => self.log_banner(call, banner),
            Outcome::List(results) => {
                if results.items.is_empty() {
                    info!(total_count = results.total_count, "Search results: 0 banners on this page");
                }
                let stats = ListStatistics::from_banners(&results.items, self.clock.now());
                info!(
                    total_count = results.total_count,
                    page_items = results.items.len(),
                    active = stats.active,
                    scheduled = stats.scheduled,
                    expired = stats.expired,
                    inactive = stats.inactive,
                    "Search results enhanced"
                );
                results.statistics = Some(stats);
            }
            Outcome::Deleted(_) => {}
        }
        Ok(())
    }
}
