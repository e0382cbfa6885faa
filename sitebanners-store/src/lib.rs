//! Storage layer for SiteBanners.
//!
//! Defines the [`BannerStore`] contract the repository's interceptor chain
//! terminates in, plus [`MemoryStore`], a process-local implementation with
//! optional JSON snapshot persistence.
//!
//! # Architecture
//!
//! - `save` / `get_by_id` / `get_list` / `delete` are the only store
//!   operations; `delete_by_id` is composed by the repository facade
//! - Search criteria are evaluated by [`query`]: groups AND, filters in a
//!   group OR, NULL only matches `null`
//! - The store owns the authoritative copy; callers get clones

mod error;
mod memory;
pub mod query;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::BannerStore;
