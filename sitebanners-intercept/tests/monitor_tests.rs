mod common;

use chrono::Duration as ChronoDuration;
use common::{CountingStore, fixed_clock};
use pretty_assertions::assert_eq;
use sitebanners_intercept::interceptors::{
    LatencyMonitor, LatencyStats, ResultEnhancer, RetryTransient,
};
use sitebanners_intercept::{CallContext, ChainBuilder, Dispatcher, Operation, RepositoryError};
use sitebanners_types::{Banner, Clock, ListStatistics, SearchCriteria};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn monitored(store: &Arc<CountingStore>) -> (Dispatcher, Arc<LatencyMonitor>) {
    let monitor = Arc::new(LatencyMonitor::default());
    let dispatcher = ChainBuilder::new()
        .register(monitor.clone(), 20, &[Operation::GetList])
        .build(store.clone());
    (dispatcher, monitor)
}

#[tokio::test(start_paused = true)]
async fn fast_query_is_not_slow() {
    let store = Arc::new(CountingStore::new());
    store.set_read_delay(Duration::from_millis(20));
    let (dispatcher, monitor) = monitored(&store);

    dispatcher
        .get_list(&CallContext::new(), SearchCriteria::all())
        .await
        .unwrap();

    assert_eq!(
        monitor.stats(),
        LatencyStats {
            queries: 1,
            slow_queries: 0,
            failures: 0
        }
    );
}

#[tokio::test(start_paused = true)]
async fn query_over_threshold_is_slow() {
    let store = Arc::new(CountingStore::new());
    store.set_read_delay(Duration::from_millis(250));
    let (dispatcher, monitor) = monitored(&store);

    dispatcher
        .get_list(&CallContext::new(), SearchCriteria::all())
        .await
        .unwrap();

    assert_eq!(monitor.stats().slow_queries, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_query_is_timed_and_reraised() {
    let store = Arc::new(CountingStore::new());
    store.fail_next_reads(1);
    let (dispatcher, monitor) = monitored(&store);

    let err = dispatcher
        .get_list(&CallContext::new(), SearchCriteria::all())
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(monitor.stats().failures, 1);
    assert_eq!(monitor.stats().queries, 1);
}

#[test]
fn threshold_boundary_is_not_slow() {
    let monitor = LatencyMonitor::default();
    assert!(!monitor.is_slow(Duration::from_millis(100)));
    assert!(monitor.is_slow(Duration::from_millis(101)));
}

fn retrying(store: &Arc<CountingStore>, attempts: u32) -> Dispatcher {
    ChainBuilder::new()
        .register(
            Arc::new(RetryTransient::new(attempts, Duration::from_millis(5))),
            0,
            &[Operation::GetById, Operation::GetList, Operation::Save],
        )
        .build(store.clone())
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_from_transient_reads() {
    let store = Arc::new(CountingStore::new());
    let id = store.seed(Banner::new("Flaky", "")).await.id.unwrap();
    store.fail_next_reads(2);
    let dispatcher = retrying(&store, 3);

    let banner = dispatcher.get_by_id(&CallContext::new(), id).await.unwrap();

    assert_eq!(banner.title, "Flaky");
    assert_eq!(store.gets(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_after_max_attempts() {
    let store = Arc::new(CountingStore::new());
    store.fail_next_reads(10);
    let dispatcher = retrying(&store, 2);

    let err = dispatcher
        .get_list(&CallContext::new(), SearchCriteria::all())
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(store.lists(), 2);
}

fn slow_retrying(store: &Arc<CountingStore>) -> Dispatcher {
    ChainBuilder::new()
        .register(
            Arc::new(RetryTransient::new(5, Duration::from_secs(10))),
            0,
            &[Operation::GetList],
        )
        .build(store.clone())
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_stops_when_cancelled() {
    let store = Arc::new(CountingStore::new());
    store.fail_next_reads(10);
    let dispatcher = slow_retrying(&store);
    let token = CancellationToken::new();
    let ctx = CallContext::new().cancelled_by(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });
    let started = tokio::time::Instant::now();
    let err = dispatcher
        .get_list(&ctx, SearchCriteria::all())
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, RepositoryError::Cancelled { operation: Operation::GetList }));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(store.lists(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_respects_the_deadline() {
    let store = Arc::new(CountingStore::new());
    store.fail_next_reads(10);
    let dispatcher = slow_retrying(&store);
    let ctx = CallContext::with_timeout(Duration::from_millis(200));

    let started = tokio::time::Instant::now();
    let err = dispatcher
        .get_list(&ctx, SearchCriteria::all())
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Timeout { timeout_ms: 200, .. }));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(store.lists(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_ignores_non_transient_errors_and_writes() {
    let store = Arc::new(CountingStore::new());
    let dispatcher = retrying(&store, 3);
    let ctx = CallContext::new();

    let err = dispatcher
        .get_by_id(&ctx, sitebanners_types::BannerId::new(1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.gets(), 1);

    store.fail_saves(true);
    assert!(dispatcher.save(&ctx, Banner::new("Once", "")).await.is_err());
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn enhancer_attaches_list_statistics() {
    let clock = fixed_clock();
    let now = clock.now();
    let store = Arc::new(CountingStore::new());
    store.seed(Banner::new("Always on", "")).await;
    store
        .seed(Banner::new("Upcoming", "").with_window(Some(now + ChronoDuration::days(3)), None))
        .await;
    store
        .seed(Banner::new("Past", "").with_window(None, Some(now - ChronoDuration::days(1))))
        .await;
    store.seed(Banner::new("Off", "").with_active(false)).await;

    let dispatcher = ChainBuilder::new()
        .register(
            Arc::new(ResultEnhancer::new(clock)),
            50,
            &[Operation::Save, Operation::GetById, Operation::GetList],
        )
        .build(store.clone());

    let results = dispatcher
        .get_list(&CallContext::new(), SearchCriteria::all())
        .await
        .unwrap();

    assert_eq!(
        results.statistics,
        Some(ListStatistics {
            active: 1,
            scheduled: 1,
            expired: 1,
            inactive: 1,
            with_dates: 2,
            without_dates: 1,
        })
    );
}

#[tokio::test]
async fn enhancer_leaves_single_banners_alone() {
    let store = Arc::new(CountingStore::new());
    let dispatcher = ChainBuilder::new()
        .register(Arc::new(ResultEnhancer::new(fixed_clock())), 50, &[Operation::Save])
        .build(store);

    let input = Banner::new("Plain", "text");
    let saved = dispatcher.save(&CallContext::new(), input).await.unwrap();
    assert_eq!(saved.title, "Plain");
    assert_eq!(saved.content, "text");
}

#[tokio::test]
async fn bare_dispatcher_has_no_statistics() {
    let store = Arc::new(CountingStore::new());
    let dispatcher = Dispatcher::bare(store);
    let results = dispatcher
        .get_list(&CallContext::new(), SearchCriteria::all())
        .await
        .unwrap();
    assert_eq!(results.statistics, None);
    assert_eq!(results.total_count, 0);
}
