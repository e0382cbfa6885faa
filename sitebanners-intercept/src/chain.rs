//! Chain assembly and dispatch.

use crate::{Call, CallContext, Interceptor, Next, Operation, Outcome, RepositoryError, RepositoryResult};
use futures::future::BoxFuture;
use sitebanners_store::BannerStore;
use sitebanners_types::{Banner, BannerId, SearchCriteria, SearchResults};
use std::sync::Arc;
use tracing::{debug, error};

/// One interceptor registered against a set of operations.
#[derive(Clone)]
pub struct Registration {
    pub interceptor: Arc<dyn Interceptor>,
    /// Lower runs first (and is outermost for `around`).
    pub order: i32,
    pub operations: Vec<Operation>,
}

/// Collects registrations and freezes them into a [`Dispatcher`].
#[derive(Default)]
pub struct ChainBuilder {
    registrations: Vec<Registration>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interceptor for the given operations. Equal orders keep
    /// registration order.
    #[must_use]
    pub fn register(
        mut self,
        interceptor: Arc<dyn Interceptor>,
        order: i32,
        operations: &[Operation],
    ) -> Self {
        self.registrations.push(Registration {
            interceptor,
            order,
            operations: operations.to_vec(),
        });
        self
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Sorts every operation's chain once and binds it to the store.
    pub fn build(self, store: Arc<dyn BannerStore>) -> Dispatcher {
        let mut sorted = self.registrations;
        // stable: ties keep registration order
        sorted.sort_by_key(|r| r.order);

        let chains = Operation::ALL.map(|op| {
            let chain: Vec<Arc<dyn Interceptor>> = sorted
                .iter()
                .filter(|r| r.operations.contains(&op))
                .map(|r| Arc::clone(&r.interceptor))
                .collect();
            debug!(
                operation = %op,
                chain = ?chain.iter().map(|i| i.name().to_string()).collect::<Vec<_>>(),
                "Interceptor chain assembled"
            );
            chain
        });

        Dispatcher { store, chains }
    }
}

/// Routes calls through their operation's interceptor chain to the store.
pub struct Dispatcher {
    store: Arc<dyn BannerStore>,
    chains: [Vec<Arc<dyn Interceptor>>; 5],
}

impl Dispatcher {
    /// A dispatcher with no interceptors at all.
    pub fn bare(store: Arc<dyn BannerStore>) -> Self {
        ChainBuilder::new().build(store)
    }

    /// Interceptor names for an operation, outermost first.
    pub fn chain_names(&self, operation: Operation) -> Vec<&str> {
        self.chain(operation).iter().map(|i| i.name()).collect()
    }

    fn chain(&self, operation: Operation) -> &[Arc<dyn Interceptor>] {
        &self.chains[operation.index()]
    }

    /// Runs `before` hooks, the `around` chain and `after` hooks for one call.
    pub fn dispatch<'a>(
        &'a self,
        ctx: &'a CallContext,
        call: Call,
    ) -> BoxFuture<'a, RepositoryResult<Outcome>> {
        Box::pin(async move {
            let operation = call.operation();
            let chain = self.chain(operation);

            let mut call = call;
            for interceptor in chain {
                call = interceptor.before(ctx, call).await?;
                if call.operation() != operation {
                    return Err(RepositoryError::Interceptor {
                        name: interceptor.name().to_string(),
                        message: format!(
                            "before hook turned {} into {}",
                            operation,
                            call.operation()
                        ),
                    });
                }
            }

            let next = Next {
                dispatcher: self,
                ctx,
                remaining: chain,
            };
            let mut outcome = next.run(call.clone()).await?;

            for interceptor in chain {
                let snapshot = outcome.clone();
                if let Err(e) = interceptor.after(ctx, &call, &mut outcome).await {
                    error!(
                        interceptor = interceptor.name(),
                        operation = %operation,
                        error = %e,
                        "after hook failed, keeping the unmodified result"
                    );
                    outcome = snapshot;
                }
            }
            Ok(outcome)
        })
    }

    /// The innermost step: the real store call. `delete_by_id` is composed
    /// from `get_by_id` and `delete`, each through its own chain.
    pub(crate) async fn terminal(&self, ctx: &CallContext, call: Call) -> RepositoryResult<Outcome> {
        let operation = call.operation();
        match call {
            Call::Save(banner) => ctx
                .run_store(operation, self.store.save(banner))
                .await
                .map(Outcome::Banner),
            Call::GetById(id) => ctx
                .run_store(operation, self.store.get_by_id(id))
                .await
                .map(Outcome::Banner),
            Call::GetList(criteria) => ctx
                .run_store(operation, self.store.get_list(&criteria))
                .await
                .map(Outcome::List),
            Call::Delete(banner) => ctx
                .run_store(operation, self.store.delete(&banner))
                .await
                .map(Outcome::Deleted),
            Call::DeleteById(id) => {
                let banner = self.get_by_id(ctx, id).await?;
                self.delete(ctx, banner).await.map(Outcome::Deleted)
            }
        }
    }

    pub async fn save(&self, ctx: &CallContext, banner: Banner) -> RepositoryResult<Banner> {
        self.dispatch(ctx, Call::Save(banner))
            .await?
            .into_banner(Operation::Save)
    }

    pub async fn get_by_id(&self, ctx: &CallContext, id: BannerId) -> RepositoryResult<Banner> {
        self.dispatch(ctx, Call::GetById(id))
            .await?
            .into_banner(Operation::GetById)
    }

    pub async fn get_list(
        &self,
        ctx: &CallContext,
        criteria: SearchCriteria,
    ) -> RepositoryResult<SearchResults> {
        self.dispatch(ctx, Call::GetList(criteria))
            .await?
            .into_list(Operation::GetList)
    }

    pub async fn delete(&self, ctx: &CallContext, banner: Banner) -> RepositoryResult<bool> {
        self.dispatch(ctx, Call::Delete(banner))
            .await?
            .into_deleted(Operation::Delete)
    }

    pub async fn delete_by_id(&self, ctx: &CallContext, id: BannerId) -> RepositoryResult<bool> {
        self.dispatch(ctx, Call::DeleteById(id))
            .await?
            .into_deleted(Operation::DeleteById)
    }
}
