//! Cache-aside layer for `get_by_id`.
//!
//! The cache is a private shadow copy and never authoritative. Each key
//! carries a version that every invalidation bumps; a fetch only commits if
//! the version it saw before proceeding is still current, so an invalidation
//! that lands mid-fetch always wins. Concurrent misses on the same key are
//! serialized through a per-key async lock, so only the first one reaches
//! the store.
//!
//! Entries live for the life of the process; there is no TTL or eviction.

use crate::{Call, CallContext, Interceptor, Next, Outcome, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use serde::Serialize;
use sitebanners_types::{Banner, BannerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct Slot {
    version: u64,
    entry: Option<Banner>,
    fetch_lock: Arc<tokio::sync::Mutex<()>>,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub cached_banners: usize,
    pub banner_ids: Vec<BannerId>,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// Around `get_by_id`, `save` and `delete`.
#[derive(Default)]
pub struct CacheLayer {
    slots: Mutex<HashMap<BannerId, Slot>>,
    /// Bumped by `clear` and by poison recovery; commits from older epochs drop.
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the slot map. A poisoned map is wiped and the epoch bumped, so
    /// whatever it held is treated as a miss.
    fn slots(&self) -> MutexGuard<'_, HashMap<BannerId, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("[CACHE] Slot map lock poisoned, dropping all entries");
                let mut guard = poisoned.into_inner();
                for slot in guard.values_mut() {
                    slot.entry = None;
                    slot.version += 1;
                }
                self.epoch.fetch_add(1, Ordering::SeqCst);
                self.slots.clear_poison();
                guard
            }
        }
    }

    fn cached(&self, id: BannerId) -> Option<Banner> {
        self.slots().get(&id).and_then(|slot| slot.entry.clone())
    }

    fn fetch_lock(&self, id: BannerId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(&self.slots().entry(id).or_default().fetch_lock)
    }

    /// The (version, epoch) pair a fetch must still see to commit.
    fn stamp(&self, id: BannerId) -> (u64, u64) {
        let slots = self.slots();
        let version = slots.get(&id).map_or(0, |slot| slot.version);
        (version, self.epoch.load(Ordering::SeqCst))
    }

    fn commit(&self, id: BannerId, stamp: (u64, u64), banner: Banner) -> bool {
        let mut slots = self.slots();
        if self.epoch.load(Ordering::SeqCst) != stamp.1 {
            return false;
        }
        let slot = slots.entry(id).or_default();
        if slot.version != stamp.0 {
            return false;
        }
        slot.entry = Some(banner);
        true
    }

    /// Drops the entry for `id` and bumps its version. Returns true if an
    /// entry was present.
    pub fn invalidate(&self, id: BannerId) -> bool {
        let mut slots = self.slots();
        let slot = slots.entry(id).or_default();
        slot.version += 1;
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        slot.entry.take().is_some()
    }

    /// Drops every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut slots = self.slots();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut removed = 0;
        for slot in slots.values_mut() {
            slot.version += 1;
            if slot.entry.take().is_some() {
                removed += 1;
            }
        }
        info!("[CACHE] Cleared instance cache ({} banners removed)", removed);
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.slots();
        let mut banner_ids: Vec<BannerId> = slots
            .iter()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(id, _)| *id)
            .collect();
        banner_ids.sort();
        CacheStats {
            cached_banners: banner_ids.len(),
            banner_ids,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn hit(&self, id: BannerId, banner: Banner) -> RepositoryResult<Outcome> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        info!(banner_id = %id, "[CACHE HIT] Banner loaded from cache (skipped store query)");
        Ok(Outcome::Banner(banner))
    }

    async fn get_by_id(&self, id: BannerId, next: Next<'_>) -> RepositoryResult<Outcome> {
        if let Some(banner) = self.cached(id) {
            return self.hit(id, banner);
        }

        let fetch_lock = self.fetch_lock(id);
        let _in_flight = fetch_lock.lock().await;
        // Whoever held the lock before us may have filled the entry.
        if let Some(banner) = self.cached(id) {
            return self.hit(id, banner);
        }

        let stamp = self.stamp(id);
        self.misses.fetch_add(1, Ordering::Relaxed);
        info!(banner_id = %id, "[CACHE MISS] Banner not in cache, loading from store");

        match next.run(Call::GetById(id)).await {
            Ok(Outcome::Banner(banner)) => {
                if self.commit(id, stamp, banner.clone()) {
                    debug!(banner_id = %id, "[CACHE] Banner cached for subsequent requests");
                } else {
                    debug!(banner_id = %id, "[CACHE] Invalidated during fetch, not caching");
                }
                Ok(Outcome::Banner(banner))
            }
            Ok(other) => Ok(other),
            Err(RepositoryError::NotFound(missing)) => {
                warn!(banner_id = %missing, "[CACHE] Banner not found in store");
                Err(RepositoryError::NotFound(missing))
            }
            Err(e) => {
                error!(banner_id = %id, error = %e, "[CACHE] Error in get_by_id");
                Err(e)
            }
        }
    }

    /// Invalidates before proceeding and again once the store has answered,
    /// whatever the outcome. The second pass drops anything a concurrent read
    /// cached while the write was in flight.
    async fn write_through(&self, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        let operation = call.operation();
        let id = call.banner_id();
        if let Some(id) = id {
            if self.invalidate(id) {
                info!(banner_id = %id, %operation, "[CACHE] Invalidated cache entry");
            }
        }
        let result = next.run(call).await;
        if let Some(id) = id {
            if self.invalidate(id) {
                debug!(banner_id = %id, %operation, "[CACHE] Dropped entry cached during write");
            }
        }
        match result {
            Ok(outcome) => {
                if let Outcome::Banner(saved) = &outcome {
                    debug!(banner_id = ?saved.id, "[CACHE] Banner saved, cache entry stays invalidated");
                }
                Ok(outcome)
            }
            Err(e) => {
                error!(%operation, error = %e, "[CACHE] Error while proceeding");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Interceptor for CacheLayer {
    fn name(&self) -> &str {
        "cache_layer"
    }

    async fn around(&self, _ctx: &CallContext, call: Call, next: Next<'_>) -> RepositoryResult<Outcome> {
        match call {
            Call::GetById(id) => self.get_by_id(id, next).await,
            Call::Save(_) | Call::Delete(_) => self.write_through(call, next).await,
            other => next.run(other).await,
        }
    }
}
