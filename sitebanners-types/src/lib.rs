//! Core type definitions for SiteBanners.
//!
//! This crate defines the plain data types shared by the store, the
//! interceptor chain and the repository facade:
//! - Banner identifiers and the [`Banner`] record
//! - An injectable [`Clock`] used wherever "now" matters
//! - Search criteria (filters, sort orders, paging) and result envelopes
//!
//! Nothing in here performs I/O; persistence lives in `sitebanners-store`.

mod banner;
mod clock;
mod criteria;
mod ids;

pub use banner::{Banner, DisplayStatus};
pub use clock::{Clock, FixedClock, SystemClock};
pub use criteria::{
    BannerField, Condition, Filter, FilterGroup, FilterValue, ListStatistics, SearchCriteria,
    SearchCriteriaBuilder, SearchResults, SortDirection, SortOrder,
};
pub use ids::BannerId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid banner id: {0}")]
    InvalidId(#[from] std::num::ParseIntError),

    #[error("unknown field: {0}")]
    UnknownField(String),
}
