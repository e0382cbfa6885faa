use crate::StoreResult;
use async_trait::async_trait;
use sitebanners_types::{Banner, BannerId, SearchCriteria, SearchResults};

/// A persistent CRUD store for banners.
///
/// Implementations own the authoritative state. Every method returns owned
/// copies so callers never hold references into the store.
#[async_trait]
pub trait BannerStore: Send + Sync {
    /// Creates the banner when `id` is absent, otherwise writes it under its id.
    /// Returns the stored record with id and timestamps filled in.
    async fn save(&self, banner: Banner) -> StoreResult<Banner>;

    /// Loads a banner. Fails with `NotFound` if absent.
    async fn get_by_id(&self, id: BannerId) -> StoreResult<Banner>;

    /// Runs a filtered, sorted, paged query.
    async fn get_list(&self, criteria: &SearchCriteria) -> StoreResult<SearchResults>;

    /// Removes a banner. Fails with `NotFound` if absent.
    async fn delete(&self, banner: &Banner) -> StoreResult<bool>;
}
