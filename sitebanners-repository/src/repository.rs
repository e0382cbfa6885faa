//! The banner repository facade.

use crate::RepositoryConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sitebanners_intercept::interceptors::{
    AuditLog, CacheLayer, DeleteGuard, LatencyMonitor, ResultEnhancer, RetryTransient,
    TitleSanitizer,
};
use sitebanners_intercept::{
    CallContext, ChainBuilder, Dispatcher, Operation, RepositoryError, RepositoryResult,
};
use sitebanners_store::{BannerStore, MemoryStore};
use sitebanners_types::{
    Banner, BannerField, BannerId, Clock, Filter, ListStatistics, SearchCriteria, SearchResults,
    SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Outcome of a bulk action. Every id is attempted; failures don't stop the
/// rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MassActionReport {
    pub processed: usize,
    pub errors: Vec<String>,
}

impl MassActionReport {
    fn fail(&mut self, id: BannerId, err: &RepositoryError) {
        self.errors.push(format!("[Banner ID: {id}] {err}"));
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The public banner API. Every call goes through the interceptor chain.
///
/// Handles to the stock interceptors are kept so callers can inspect cache,
/// latency and audit state; a handle is `None` when that interceptor is
/// disabled.
pub struct BannerRepository {
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    timeout: Option<Duration>,
    cache: Option<Arc<CacheLayer>>,
    latency: Option<Arc<LatencyMonitor>>,
    guard: Option<Arc<DeleteGuard>>,
    audit: Option<Arc<AuditLog>>,
}

impl BannerRepository {
    /// An empty in-memory repository with the default interceptors.
    pub fn open_in_memory() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(MemoryStore::with_clock(Arc::clone(&clock)));
        Self::new(store, &RepositoryConfig::default(), clock)
    }

    /// Wires the interceptors `config` enables in front of `store`.
    pub fn new(store: Arc<dyn BannerStore>, config: &RepositoryConfig, clock: Arc<dyn Clock>) -> Self {
        let mut builder = ChainBuilder::new();

        let cache = config.cache.enabled.then(|| Arc::new(CacheLayer::new()));
        if let Some(cache) = &cache {
            builder = builder.register(
                cache.clone(),
                config.cache.order,
                &[Operation::GetById, Operation::Save, Operation::Delete],
            );
        }

        let latency = config.latency.enabled.then(|| {
            Arc::new(LatencyMonitor::new(Duration::from_millis(
                config.latency.slow_query_ms,
            )))
        });
        if let Some(latency) = &latency {
            builder = builder.register(latency.clone(), config.latency.order, &[Operation::GetList]);
        }

        let guard = config
            .guard
            .enabled
            .then(|| Arc::new(DeleteGuard::new(config.guard.protected_below)));
        if let Some(guard) = &guard {
            builder = builder.register(
                guard.clone(),
                config.guard.order,
                &[Operation::Delete, Operation::DeleteById],
            );
        }

        if config.sanitizer.enabled {
            builder = builder.register(
                Arc::new(TitleSanitizer::new()),
                config.sanitizer.order,
                &[Operation::Save],
            );
        }

        let audit = config
            .audit
            .enabled
            .then(|| Arc::new(AuditLog::new(Arc::clone(&clock), config.audit.capacity)));
        if let Some(audit) = &audit {
            builder = builder.register(
                audit.clone(),
                config.audit.order,
                &[Operation::Save, Operation::Delete, Operation::DeleteById],
            );
        }

        if config.enhancer.enabled {
            builder = builder.register(
                Arc::new(ResultEnhancer::new(Arc::clone(&clock))),
                config.enhancer.order,
                &[Operation::Save, Operation::GetById, Operation::GetList],
            );
        }

        if config.retry.enabled {
            builder = builder.register(
                Arc::new(RetryTransient::new(
                    config.retry.max_attempts,
                    Duration::from_millis(config.retry.backoff_ms),
                )),
                config.retry.order,
                &[Operation::GetById, Operation::GetList],
            );
        }

        Self {
            dispatcher: builder.build(store),
            clock,
            timeout: config.store.timeout(),
            cache,
            latency,
            guard,
            audit,
        }
    }

    /// Wraps a hand-built dispatcher. No interceptor handles are available.
    pub fn from_dispatcher(dispatcher: Dispatcher, clock: Arc<dyn Clock>) -> Self {
        Self {
            dispatcher,
            clock,
            timeout: None,
            cache: None,
            latency: None,
            guard: None,
            audit: None,
        }
    }

    /// A fresh context carrying the configured default timeout.
    pub fn context(&self) -> CallContext {
        match self.timeout {
            Some(timeout) => CallContext::with_timeout(timeout),
            None => CallContext::new(),
        }
    }

    pub async fn save(&self, banner: Banner) -> RepositoryResult<Banner> {
        self.save_with(&self.context(), banner).await
    }

    pub async fn get_by_id(&self, id: BannerId) -> RepositoryResult<Banner> {
        self.get_by_id_with(&self.context(), id).await
    }

    pub async fn get_list(&self, criteria: SearchCriteria) -> RepositoryResult<SearchResults> {
        self.get_list_with(&self.context(), criteria).await
    }

    pub async fn delete(&self, banner: Banner) -> RepositoryResult<bool> {
        self.delete_with(&self.context(), banner).await
    }

    /// Loads the banner, then deletes it; both steps run their own chains.
    pub async fn delete_by_id(&self, id: BannerId) -> RepositoryResult<bool> {
        self.delete_by_id_with(&self.context(), id).await
    }

    pub async fn save_with(&self, ctx: &CallContext, banner: Banner) -> RepositoryResult<Banner> {
        self.dispatcher.save(ctx, banner).await
    }

    pub async fn get_by_id_with(&self, ctx: &CallContext, id: BannerId) -> RepositoryResult<Banner> {
        self.dispatcher.get_by_id(ctx, id).await
    }

    pub async fn get_list_with(
        &self,
        ctx: &CallContext,
        criteria: SearchCriteria,
    ) -> RepositoryResult<SearchResults> {
        self.dispatcher.get_list(ctx, criteria).await
    }

    pub async fn delete_with(&self, ctx: &CallContext, banner: Banner) -> RepositoryResult<bool> {
        self.dispatcher.delete(ctx, banner).await
    }

    pub async fn delete_by_id_with(&self, ctx: &CallContext, id: BannerId) -> RepositoryResult<bool> {
        self.dispatcher.delete_by_id(ctx, id).await
    }

    /// Banners to show right now, by ascending sort order.
    pub async fn active_banners(&self, now: DateTime<Utc>) -> RepositoryResult<Vec<Banner>> {
        let results = self.get_list(SearchCriteria::visible_at(now)).await?;
        Ok(results.items)
    }

    /// Total banners, or only enabled ones. Date windows are ignored.
    pub async fn banner_count(&self, active_only: bool) -> RepositoryResult<usize> {
        let mut builder = SearchCriteria::builder().page_size(1);
        if active_only {
            builder = builder.add_filter(Filter::eq(BannerField::IsActive, true));
        }
        Ok(self.get_list(builder.build()).await?.total_count)
    }

    /// Like `get_by_id`, but a missing banner is `None` rather than an error.
    pub async fn find_banner(&self, id: BannerId) -> RepositoryResult<Option<Banner>> {
        match self.get_by_id(id).await {
            Ok(banner) => Ok(Some(banner)),
            Err(RepositoryError::NotFound(_)) => {
                warn!(banner_id = %id, "Banner not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Lifecycle breakdown of every stored banner.
    pub async fn statistics(&self) -> RepositoryResult<ListStatistics> {
        let results = self.get_list(SearchCriteria::all()).await?;
        Ok(ListStatistics::from_banners(&results.items, self.clock.now()))
    }

    /// Deletes each id through `delete_by_id`, collecting failures.
    pub async fn delete_many(&self, ids: &[BannerId]) -> MassActionReport {
        let mut report = MassActionReport::default();
        for &id in ids {
            match self.delete_by_id(id).await {
                Ok(true) => report.processed += 1,
                Ok(false) => debug!(banner_id = %id, "Delete reported nothing removed"),
                Err(e) => {
                    error!(banner_id = %id, error = %e, "Mass delete failed for banner");
                    report.fail(id, &e);
                }
            }
        }
        report
    }

    /// Enables each banner through `save`, collecting failures.
    pub async fn enable_many(&self, ids: &[BannerId]) -> MassActionReport {
        let mut report = MassActionReport::default();
        for &id in ids {
            let result = match self.get_by_id(id).await {
                Ok(banner) => self.save(banner.with_active(true)).await.map(|_| ()),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    error!(banner_id = %id, error = %e, "Mass enable failed for banner");
                    report.fail(id, &e);
                }
            }
        }
        report
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn cache(&self) -> Option<&CacheLayer> {
        self.cache.as_deref()
    }

    pub fn latency(&self) -> Option<&LatencyMonitor> {
        self.latency.as_deref()
    }

    pub fn guard(&self) -> Option<&DeleteGuard> {
        self.guard.as_deref()
    }

    pub fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_deref()
    }
}
