//! Interceptor chain for the SiteBanners repository.
//!
//! Every repository operation (`save`, `get_by_id`, `get_list`, `delete`,
//! `delete_by_id`) is dispatched through an ordered list of interceptors
//! before it reaches the [`BannerStore`](sitebanners_store::BannerStore):
//!
//! 1. all `before` hooks, ascending order, may rewrite the arguments
//! 2. the `around` hooks, nested so the lowest order is outermost, ending in
//!    the store call; any of them may short-circuit or retry via [`Next`]
//! 3. all `after` hooks, ascending order, may rewrite the result; their
//!    failures are logged and swallowed
//!
//! Chains are assembled once by [`ChainBuilder`] and are immutable afterwards.

mod chain;
mod error;
pub mod interceptors;
mod protocol;

pub use chain::{ChainBuilder, Dispatcher, Registration};
pub use error::{RepositoryError, RepositoryResult};
pub use protocol::{Call, CallContext, Interceptor, Next, Operation, Outcome};
