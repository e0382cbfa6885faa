//! Shared test helpers for interceptor tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sitebanners_store::{BannerStore, MemoryStore, StoreError, StoreResult};
use sitebanners_types::{Banner, BannerId, FixedClock, SearchCriteria, SearchResults};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()))
}

/// A `MemoryStore` that counts calls and can be told to stall or fail.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    saves: AtomicUsize,
    gets: AtomicUsize,
    lists: AtomicUsize,
    deletes: AtomicUsize,
    read_delay: Mutex<Duration>,
    write_delay: Mutex<Duration>,
    transient_reads: AtomicUsize,
    fail_saves: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::with_clock(fixed_clock()),
            ..Self::default()
        }
    }

    /// Inserts directly, bypassing counters.
    pub async fn seed(&self, banner: Banner) -> Banner {
        self.inner.save(banner).await.unwrap()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Every `get_by_id` / `get_list` reads its answer, then sleeps this
    /// long before returning it.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    /// Every `save` / `delete` sleeps this long before writing.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = delay;
    }

    async fn write_prelude(&self) {
        let delay = *self.write_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// The next `n` reads fail with `Unavailable`.
    pub fn fail_next_reads(&self, n: usize) {
        self.transient_reads.store(n, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    async fn read_prelude(&self) -> StoreResult<()> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .transient_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BannerStore for CountingStore {
    async fn save(&self, banner: Banner) -> StoreResult<Banner> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".into()));
        }
        self.write_prelude().await;
        self.inner.save(banner).await
    }

    async fn get_by_id(&self, id: BannerId) -> StoreResult<Banner> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let found = self.inner.get_by_id(id).await;
        self.read_prelude().await?;
        found
    }

    async fn get_list(&self, criteria: &SearchCriteria) -> StoreResult<SearchResults> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let found = self.inner.get_list(criteria).await;
        self.read_prelude().await?;
        found
    }

    async fn delete(&self, banner: &Banner) -> StoreResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.write_prelude().await;
        self.inner.delete(banner).await
    }
}
