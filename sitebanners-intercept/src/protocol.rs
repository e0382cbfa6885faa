//! The contract between the dispatcher and interceptors.

use crate::{Dispatcher, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sitebanners_store::StoreResult;
use sitebanners_types::{Banner, BannerId, SearchCriteria, SearchResults};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A repository operation an interceptor can be registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Save,
    GetById,
    GetList,
    Delete,
    DeleteById,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Self::Save,
        Self::GetById,
        Self::GetList,
        Self::Delete,
        Self::DeleteById,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::GetById => "get_by_id",
            Self::GetList => "get_list",
            Self::Delete => "delete",
            Self::DeleteById => "delete_by_id",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Save => 0,
            Self::GetById => 1,
            Self::GetList => 2,
            Self::Delete => 3,
            Self::DeleteById => 4,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The arguments of one operation invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Save(Banner),
    GetById(BannerId),
    GetList(SearchCriteria),
    Delete(Banner),
    DeleteById(BannerId),
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Save(_) => Operation::Save,
            Self::GetById(_) => Operation::GetById,
            Self::GetList(_) => Operation::GetList,
            Self::Delete(_) => Operation::Delete,
            Self::DeleteById(_) => Operation::DeleteById,
        }
    }

    /// The id the call targets, if any (unsaved banners have none).
    pub fn banner_id(&self) -> Option<BannerId> {
        match self {
            Self::Save(banner) | Self::Delete(banner) => banner.id,
            Self::GetById(id) | Self::DeleteById(id) => Some(*id),
            Self::GetList(_) => None,
        }
    }
}

/// The result of one operation invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `save` and `get_by_id`.
    Banner(Banner),
    /// `get_list`.
    List(SearchResults),
    /// `delete` and `delete_by_id`.
    Deleted(bool),
}

impl Outcome {
    pub fn into_banner(self, operation: Operation) -> RepositoryResult<Banner> {
        match self {
            Self::Banner(banner) => Ok(banner),
            _ => Err(RepositoryError::UnexpectedOutcome { operation }),
        }
    }

    pub fn into_list(self, operation: Operation) -> RepositoryResult<SearchResults> {
        match self {
            Self::List(results) => Ok(results),
            _ => Err(RepositoryError::UnexpectedOutcome { operation }),
        }
    }

    pub fn into_deleted(self, operation: Operation) -> RepositoryResult<bool> {
        match self {
            Self::Deleted(deleted) => Ok(deleted),
            _ => Err(RepositoryError::UnexpectedOutcome { operation }),
        }
    }
}

/// Per-invocation context: an optional deadline and a cancellation token.
///
/// The deadline is fixed when the context is created, so retries and nested
/// calls (`delete_by_id` → `get_by_id` + `delete`) share one deadline.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl CallContext {
    /// No deadline, never cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store calls must finish within `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a caller-owned cancellation token.
    #[must_use]
    pub fn cancelled_by(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs a store future under this context's deadline and cancellation.
    pub async fn run_store<T, F>(&self, operation: Operation, work: F) -> RepositoryResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        if self.cancel.is_cancelled() {
            return Err(RepositoryError::Cancelled { operation });
        }
        let work = async { work.await.map_err(RepositoryError::from) };
        let bounded = async {
            match (self.deadline, self.timeout) {
                (Some(deadline), Some(timeout)) => tokio::time::timeout_at(deadline, work)
                    .await
                    .unwrap_or_else(|_| {
                        Err(RepositoryError::Timeout {
                            operation,
                            timeout_ms: timeout.as_millis() as u64,
                        })
                    }),
                _ => work.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RepositoryError::Cancelled { operation }),
            result = bounded => result,
        }
    }
}

/// A unit of cross-cutting behaviour composed around repository operations.
///
/// All three hooks have pass-through defaults; implement only what you need.
/// The dispatcher calls the hooks of every interceptor registered for the
/// operation being dispatched.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Runs before the call. May replace the arguments (but not the operation).
    /// An error aborts the call and reaches the caller unchanged.
    async fn before(&self, ctx: &CallContext, call: Call) -> RepositoryResult<Call> {
        let _ = ctx;
        Ok(call)
    }

    /// Wraps the rest of the chain. `next.run(call)` proceeds; not calling it
    /// short-circuits, calling it again retries.
    async fn around(&self, ctx: &CallContext, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        let _ = ctx;
        next.run(call).await
    }

    /// Runs after a successful call. May rewrite the outcome. Errors are
    /// logged by the dispatcher and the outcome is restored.
    async fn after(&self, ctx: &CallContext, call: &Call, outcome: &mut Outcome) -> anyhow::Result<()> {
        let _ = (ctx, call, outcome);
        Ok(())
    }
}

/// The continuation handed to `around`: the remaining interceptors plus the
/// store call.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    pub(crate) dispatcher: &'a Dispatcher,
    pub(crate) ctx: &'a CallContext,
    pub(crate) remaining: &'a [Arc<dyn Interceptor>],
}

impl<'a> Next<'a> {
    /// Proceeds with the rest of the chain. Each invocation reaches the store
    /// at most once.
    pub fn run(&self, call: Call) -> BoxFuture<'a, RepositoryResult<Outcome>> {
        let this = *self;
        Box::pin(async move {
            match this.remaining.split_first() {
                Some((head, rest)) => {
                    let next = Next {
                        remaining: rest,
                        ..this
                    };
                    head.around(this.ctx, call, next).await
                }
                None => this.dispatcher.terminal(this.ctx, call).await,
            }
        })
    }

    /// The dispatcher itself, for interceptors that need to issue other
    /// repository calls through the full chain.
    pub fn subject(&self) -> &'a Dispatcher {
        self.dispatcher
    }

    pub fn context(&self) -> &'a CallContext {
        self.ctx
    }
}
