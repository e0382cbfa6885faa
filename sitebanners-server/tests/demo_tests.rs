use sitebanners_repository::{BannerRepository, RepositoryConfig};
use sitebanners_server::demo::{self, DemoTest};
use sitebanners_store::MemoryStore;
use sitebanners_types::{BannerId, Clock, SystemClock};
use std::sync::Arc;

async fn run_demo(test: DemoTest) -> (BannerRepository, String) {
    let repository = BannerRepository::open_in_memory();
    let mut out = Vec::new();
    demo::run(&repository, test, &mut out).await.unwrap();
    (repository, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn demo_seeds_an_empty_repository() {
    let (repository, out) = run_demo(DemoTest::Performance).await;
    assert!(out.contains("Seeded 5 sample banners"));
    assert_eq!(repository.banner_count(false).await.unwrap(), 5);
}

#[tokio::test]
async fn cache_walkthrough_restores_the_title() {
    let (repository, out) = run_demo(DemoTest::Cache).await;
    assert!(out.contains("TEST 1: Cache layer"));
    assert!(out.contains("Welcome Banner Modified"));

    let welcome = repository.find_banner(BannerId::new(1)).await.unwrap().unwrap();
    assert_eq!(welcome.title, "Welcome Banner");
    let stats = repository.cache().unwrap().stats();
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn guard_walkthrough_blocks_then_allows() {
    let (repository, out) = run_demo(DemoTest::CircuitBreaker).await;
    assert!(out.contains("Pinned Announcement"));
    assert!(out.contains("EXPECTED: deletion blocked"));
    assert!(out.contains("EXPECTED: deletion approved and completed"));
    assert_eq!(repository.guard().unwrap().blocked_count(), 1);
}

#[tokio::test]
async fn all_runs_every_walkthrough() {
    let (_repository, out) = run_demo(DemoTest::All).await;
    for title in ["TEST 1", "TEST 2", "TEST 3"] {
        assert!(out.contains(title), "missing {title}");
    }
}

#[tokio::test]
async fn guard_walkthrough_survives_the_lowest_threshold() {
    let mut config = RepositoryConfig::default();
    config.guard.protected_below = i32::MIN;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::with_clock(Arc::clone(&clock)));
    let repository = BannerRepository::new(store, &config, clock);

    let mut out = Vec::new();
    demo::run(&repository, DemoTest::CircuitBreaker, &mut out)
        .await
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Pinned Announcement"));
    assert!(out.contains(&format!("Sort order: {}", i32::MIN)));
}
