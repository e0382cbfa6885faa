mod common;

use async_trait::async_trait;
use common::CountingStore;
use pretty_assertions::assert_eq;
use sitebanners_intercept::{
    Call, CallContext, ChainBuilder, Interceptor, Next, Operation, Outcome, RepositoryError,
    RepositoryResult,
};
use sitebanners_types::{Banner, BannerId, SearchCriteria};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Log = Arc<Mutex<Vec<String>>>;

/// Records every hook it sees as `"<name>:<hook>"`.
struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
        })
    }

    fn push(&self, hook: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, hook));
    }
}

#[async_trait]
impl Interceptor for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    async fn before(&self, _ctx: &CallContext, call: Call) -> RepositoryResult<Call> {
        self.push("before");
        Ok(call)
    }

    async fn around(&self, _ctx: &CallContext, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        self.push("enter");
        let result = next.run(call).await;
        self.push("exit");
        result
    }

    async fn after(&self, _ctx: &CallContext, _call: &Call, _outcome: &mut Outcome) -> anyhow::Result<()> {
        self.push("after");
        Ok(())
    }
}

struct RejectSave;

#[async_trait]
impl Interceptor for RejectSave {
    fn name(&self) -> &str {
        "reject_save"
    }

    async fn before(&self, _ctx: &CallContext, _call: Call) -> RepositoryResult<Call> {
        Err(RepositoryError::Validation("rejected before save".into()))
    }
}

/// Rewrites the title, then fails.
struct BrokenAfter;

#[async_trait]
impl Interceptor for BrokenAfter {
    fn name(&self) -> &str {
        "broken_after"
    }

    async fn after(&self, _ctx: &CallContext, _call: &Call, outcome: &mut Outcome) -> anyhow::Result<()> {
        if let Outcome::Banner(banner) = outcome {
            banner.title = "half-applied".into();
        }
        anyhow::bail!("enrichment service down")
    }
}

struct Suffix(&'static str);

#[async_trait]
impl Interceptor for Suffix {
    fn name(&self) -> &str {
        self.0
    }

    async fn after(&self, _ctx: &CallContext, _call: &Call, outcome: &mut Outcome) -> anyhow::Result<()> {
        if let Outcome::Banner(banner) = outcome {
            banner.title.push_str(self.0);
        }
        Ok(())
    }
}

struct SwapOperation;

#[async_trait]
impl Interceptor for SwapOperation {
    fn name(&self) -> &str {
        "swap_operation"
    }

    async fn before(&self, _ctx: &CallContext, call: Call) -> RepositoryResult<Call> {
        match call {
            Call::GetById(id) => Ok(Call::DeleteById(id)),
            other => Ok(other),
        }
    }
}

/// Answers every `get_by_id` itself.
struct ShortCircuit;

#[async_trait]
impl Interceptor for ShortCircuit {
    fn name(&self) -> &str {
        "short_circuit"
    }

    async fn around(&self, _ctx: &CallContext, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        match call {
            Call::GetById(id) => Ok(Outcome::Banner(Banner::new("canned", "").with_id(id))),
            other => next.run(other).await,
        }
    }
}

#[tokio::test]
async fn hooks_run_in_ascending_order_with_nested_around() {
    let store = Arc::new(CountingStore::new());
    let log = Log::default();
    let dispatcher = ChainBuilder::new()
        .register(Recorder::new("late", &log), 30, &[Operation::Save])
        .register(Recorder::new("early", &log), 10, &[Operation::Save])
        .register(Recorder::new("middle", &log), 20, &[Operation::Save])
        .build(store.clone());

    dispatcher
        .save(&CallContext::new(), Banner::new("Ordered", ""))
        .await
        .unwrap();

    let log = log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            "early:before",
            "middle:before",
            "late:before",
            "early:enter",
            "middle:enter",
            "late:enter",
            "late:exit",
            "middle:exit",
            "early:exit",
            "early:after",
            "middle:after",
            "late:after",
        ]
    );
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn equal_orders_keep_registration_order() {
    let store = Arc::new(CountingStore::new());
    let log = Log::default();
    let dispatcher = ChainBuilder::new()
        .register(Recorder::new("first", &log), 5, &[Operation::GetList])
        .register(Recorder::new("second", &log), 5, &[Operation::GetList])
        .register(Recorder::new("third", &log), 5, &[Operation::GetList])
        .build(store);

    assert_eq!(
        dispatcher.chain_names(Operation::GetList),
        vec!["first", "second", "third"]
    );
    assert!(dispatcher.chain_names(Operation::Save).is_empty());
}

#[tokio::test]
async fn interceptors_only_see_their_operations() {
    let store = Arc::new(CountingStore::new());
    let saved = store.seed(Banner::new("Seeded", "")).await;
    let log = Log::default();
    let dispatcher = ChainBuilder::new()
        .register(Recorder::new("saves_only", &log), 1, &[Operation::Save])
        .build(store);

    dispatcher
        .get_by_id(&CallContext::new(), saved.id.unwrap())
        .await
        .unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn before_hook_failure_aborts_without_store_call() {
    let store = Arc::new(CountingStore::new());
    let log = Log::default();
    let dispatcher = ChainBuilder::new()
        .register(Arc::new(RejectSave), 1, &[Operation::Save])
        .register(Recorder::new("later", &log), 2, &[Operation::Save])
        .build(store.clone());

    let err = dispatcher
        .save(&CallContext::new(), Banner::new("Never stored", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Validation(_)));
    assert_eq!(store.saves(), 0);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn after_hook_failure_is_swallowed_and_result_restored() {
    let store = Arc::new(CountingStore::new());
    let dispatcher = ChainBuilder::new()
        .register(Arc::new(Suffix("+a")), 1, &[Operation::Save])
        .register(Arc::new(BrokenAfter), 2, &[Operation::Save])
        .register(Arc::new(Suffix("+b")), 3, &[Operation::Save])
        .build(store.clone());

    let saved = dispatcher
        .save(&CallContext::new(), Banner::new("Kept", ""))
        .await
        .unwrap();

    // the broken hook's partial rewrite is discarded, the others apply
    assert_eq!(saved.title, "Kept+a+b");
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn before_hook_cannot_change_the_operation() {
    let store = Arc::new(CountingStore::new());
    let saved = store.seed(Banner::new("Target", "")).await;
    let dispatcher = ChainBuilder::new()
        .register(Arc::new(SwapOperation), 1, &[Operation::GetById])
        .build(store.clone());

    let err = dispatcher
        .get_by_id(&CallContext::new(), saved.id.unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Interceptor { ref name, .. } if name == "swap_operation"));
    assert_eq!(store.gets(), 0);
    assert_eq!(store.deletes(), 0);
}

#[tokio::test]
async fn around_hook_may_short_circuit() {
    let store = Arc::new(CountingStore::new());
    let dispatcher = ChainBuilder::new()
        .register(Arc::new(ShortCircuit), 1, &[Operation::GetById])
        .build(store.clone());

    let banner = dispatcher
        .get_by_id(&CallContext::new(), BannerId::new(42))
        .await
        .unwrap();

    assert_eq!(banner.title, "canned");
    assert_eq!(store.gets(), 0);
}

#[tokio::test]
async fn delete_by_id_runs_get_and_delete_chains() {
    let store = Arc::new(CountingStore::new());
    let saved = store.seed(Banner::new("Doomed", "")).await;
    let log = Log::default();
    let dispatcher = ChainBuilder::new()
        .register(Recorder::new("get", &log), 1, &[Operation::GetById])
        .register(Recorder::new("delete", &log), 1, &[Operation::Delete])
        .build(store.clone());

    let deleted = dispatcher
        .delete_by_id(&CallContext::new(), saved.id.unwrap())
        .await
        .unwrap();

    assert!(deleted);
    assert_eq!(store.gets(), 1);
    assert_eq!(store.deletes(), 1);
    let log = log.lock().unwrap().clone();
    assert_eq!(log.first().map(String::as_str), Some("get:before"));
    assert!(log.contains(&"delete:after".to_string()));
}

#[tokio::test]
async fn delete_by_id_of_missing_banner_is_not_found() {
    let store = Arc::new(CountingStore::new());
    let dispatcher = ChainBuilder::new().build(store.clone());

    let err = dispatcher
        .delete_by_id(&CallContext::new(), BannerId::new(404))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(store.deletes(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_store_call_times_out() {
    let store = Arc::new(CountingStore::new());
    let saved = store.seed(Banner::new("Slow", "")).await;
    store.set_read_delay(Duration::from_millis(500));
    let dispatcher = ChainBuilder::new().build(store);

    let ctx = CallContext::with_timeout(Duration::from_millis(50));
    let err = dispatcher
        .get_by_id(&ctx, saved.id.unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::Timeout {
            operation: Operation::GetById,
            timeout_ms: 50
        }
    ));
}

#[tokio::test]
async fn cancelled_context_never_reaches_the_store() {
    let store = Arc::new(CountingStore::new());
    let dispatcher = ChainBuilder::new().build(store.clone());
    let token = CancellationToken::new();
    token.cancel();

    let ctx = CallContext::new().cancelled_by(token);
    let err = dispatcher
        .get_list(&ctx, SearchCriteria::all())
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Cancelled { operation: Operation::GetList }));
    assert_eq!(store.lists(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_an_in_flight_call() {
    let store = Arc::new(CountingStore::new());
    store.set_read_delay(Duration::from_secs(10));
    let dispatcher = Arc::new(ChainBuilder::new().build(store));
    let token = CancellationToken::new();

    let handle = {
        let dispatcher = Arc::clone(&dispatcher);
        let ctx = CallContext::new().cancelled_by(token.clone());
        tokio::spawn(async move { dispatcher.get_list(&ctx, SearchCriteria::all()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, RepositoryError::Cancelled { .. }));
}
