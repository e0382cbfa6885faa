//! Process-local banner store.

use crate::{BannerStore, StoreError, StoreResult, query};
use async_trait::async_trait;
use sitebanners_types::{Banner, BannerId, Clock, SearchCriteria, SearchResults, SystemClock};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// A [`BannerStore`] backed by an ordered in-memory map.
///
/// Ids are handed out from a monotonically increasing sequence starting at 1.
/// The whole map can be written to and read back from a JSON snapshot.
pub struct MemoryStore {
    banners: RwLock<BTreeMap<BannerId, Banner>>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Creates an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store stamping records with the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            banners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            clock,
        }
    }

    /// Loads a JSON snapshot (an array of banners with ids).
    /// A missing file yields an empty store.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let store = Self::with_clock(clock);
        if !path.exists() {
            info!("No snapshot at {:?}, starting with an empty store", path);
            return Ok(store);
        }
        let bytes = std::fs::read(path)?;
        let banners: Vec<Banner> = serde_json::from_slice(&bytes)?;
        {
            let mut map = store.write()?;
            for banner in banners {
                let id = banner.id.ok_or_else(|| {
                    StoreError::Validation(format!("snapshot entry \"{}\" has no id", banner.title))
                })?;
                store.reserve(id)?;
                map.insert(id, banner);
            }
            info!("Loaded {} banners from {:?}", map.len(), path);
        }
        Ok(store)
    }

    /// Writes the current contents as a JSON snapshot.
    pub fn flush(&self, path: &Path) -> StoreResult<()> {
        let banners: Vec<Banner> = self.read()?.values().cloned().collect();
        let json = serde_json::to_vec_pretty(&banners)?;
        std::fs::write(path, json)?;
        debug!("Wrote {} banners to {:?}", banners.len(), path);
        Ok(())
    }

    /// Number of stored banners.
    pub fn len(&self) -> usize {
        self.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a banner with this id is stored.
    pub fn contains(&self, id: BannerId) -> bool {
        self.read().map(|map| map.contains_key(&id)).unwrap_or(false)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<BannerId, Banner>>> {
        self.banners
            .read()
            .map_err(|_| StoreError::Unavailable("banner map lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<BannerId, Banner>>> {
        self.banners
            .write()
            .map_err(|_| StoreError::Unavailable("banner map lock poisoned".into()))
    }

    /// Moves the id sequence past an explicitly supplied id.
    fn reserve(&self, id: BannerId) -> StoreResult<()> {
        let next = id
            .get()
            .checked_add(1)
            .ok_or_else(|| StoreError::Validation(format!("banner id {id} is out of range")))?;
        self.next_id.fetch_max(next, Ordering::SeqCst);
        Ok(())
    }

    fn validate(banner: &Banner) -> StoreResult<()> {
        if banner.title.trim().is_empty() {
            return Err(StoreError::Validation("title is required".into()));
        }
        if !banner.has_valid_window() {
            return Err(StoreError::Validation(
                "active_from must not be later than active_to".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BannerStore for MemoryStore {
    async fn save(&self, mut banner: Banner) -> StoreResult<Banner> {
        Self::validate(&banner)?;
        let now = self.clock.now();
        let mut map = self.write()?;

        let id = match banner.id {
            Some(id) => {
                self.reserve(id)?;
                id
            }
            None => BannerId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        banner.id = Some(id);
        banner.created_at = map
            .get(&id)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        banner.updated_at = Some(now);

        map.insert(id, banner.clone());
        Ok(banner)
    }

    async fn get_by_id(&self, id: BannerId) -> StoreResult<Banner> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_list(&self, criteria: &SearchCriteria) -> StoreResult<SearchResults> {
        let map = self.read()?;
        let (items, total_count) = query::run(criteria, map.values());
        Ok(SearchResults {
            items,
            total_count,
            criteria: criteria.clone(),
            statistics: None,
        })
    }

    async fn delete(&self, banner: &Banner) -> StoreResult<bool> {
        let id = banner
            .id
            .ok_or_else(|| StoreError::Validation("cannot delete a banner without an id".into()))?;
        self.write()?
            .remove(&id)
            .map(|_| true)
            .ok_or(StoreError::NotFound(id))
    }
}
