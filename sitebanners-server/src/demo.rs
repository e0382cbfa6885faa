//! Scripted walkthroughs of the around-interceptors.
//!
//! Each walkthrough drives a real repository and narrates what the logs
//! should show. The repository is seeded with the sample banners first if it
//! is empty.

use anyhow::{Context, Result};
use clap::ValueEnum;
use sitebanners_repository::{BannerRepository, RepositoryError};
use sitebanners_types::{Banner, BannerField, Filter, SearchCriteria};
use std::io::Write;

const RULE: &str = "==================================================";
const TEST_RULE: &str = "--------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoTest {
    Cache,
    Performance,
    CircuitBreaker,
    All,
}

pub async fn run<W: Write + Send>(repository: &BannerRepository, test: DemoTest, out: &mut W) -> Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "   Around Interceptors Walkthrough")?;
    writeln!(out, "{RULE}")?;
    writeln!(out)?;

    if repository.banner_count(false).await? == 0 {
        let seeded = repository.seed_sample_banners().await?;
        writeln!(out, "Seeded {} sample banners", seeded.len())?;
        writeln!(out)?;
    }

    match test {
        DemoTest::Cache => cache(repository, out).await?,
        DemoTest::Performance => performance(repository, out).await?,
        DemoTest::CircuitBreaker => circuit_breaker(repository, out).await?,
        DemoTest::All => {
            cache(repository, out).await?;
            writeln!(out)?;
            performance(repository, out).await?;
            writeln!(out)?;
            circuit_breaker(repository, out).await?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Run with --verbose and filter the log for CACHE, PERFORMANCE or CIRCUIT BREAKER")?;
    writeln!(out, "{RULE}")?;
    Ok(())
}

fn header<W: Write>(out: &mut W, title: &str) -> Result<()> {
    writeln!(out, "{TEST_RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{TEST_RULE}")?;
    writeln!(out)?;
    Ok(())
}

async fn cache<W: Write + Send>(repository: &BannerRepository, out: &mut W) -> Result<()> {
    header(out, "TEST 1: Cache layer")?;

    let first_page = repository
        .get_list(SearchCriteria::builder().page_size(1).build())
        .await?;
    let Some(id) = first_page.items.first().and_then(|b| b.id) else {
        writeln!(out, "No banners found. Create some banners first.")?;
        return Ok(());
    };
    writeln!(out, "Testing cache-aside reads with banner ID: {id}")?;
    writeln!(out)?;

    writeln!(out, "1. First get_by_id() - expected: CACHE MISS")?;
    let banner = repository.get_by_id(id).await?;
    writeln!(out, "   Banner loaded: {}", banner.title)?;

    writeln!(out)?;
    writeln!(out, "2. Second get_by_id() - expected: CACHE HIT")?;
    let banner = repository.get_by_id(id).await?;
    writeln!(out, "   Banner loaded: {}", banner.title)?;

    writeln!(out)?;
    writeln!(out, "3. Save banner - expected: cache invalidated")?;
    let original_title = banner.title.clone();
    let mut modified = banner;
    modified.title = format!("{original_title} Modified");
    repository.save(modified).await?;
    writeln!(out, "   Banner saved with modified title")?;

    writeln!(out)?;
    writeln!(out, "4. Third get_by_id() after save - expected: CACHE MISS")?;
    let mut banner = repository.get_by_id(id).await?;
    writeln!(out, "   Banner loaded: {}", banner.title)?;

    banner.title = original_title;
    repository.save(banner).await?;
    writeln!(out)?;
    writeln!(out, "   Title restored to original")?;

    if let Some(cache) = repository.cache() {
        let stats = cache.stats();
        writeln!(out, "   Cache: {} hits, {} misses", stats.hits, stats.misses)?;
    }
    Ok(())
}

async fn performance<W: Write + Send>(repository: &BannerRepository, out: &mut W) -> Result<()> {
    header(out, "TEST 2: Latency monitor")?;

    writeln!(out, "1. Fast query - first 5 banners")?;
    let results = repository
        .get_list(SearchCriteria::builder().page_size(5).current_page(1).build())
        .await?;
    writeln!(out, "   Retrieved {} banners", results.total_count)?;

    writeln!(out)?;
    writeln!(out, "2. Filtered query - active banners only")?;
    let results = repository
        .get_list(
            SearchCriteria::builder()
                .add_filter(Filter::eq(BannerField::IsActive, true))
                .page_size(20)
                .build(),
        )
        .await?;
    writeln!(out, "   Retrieved {} active banners", results.items.len())?;

    writeln!(out)?;
    writeln!(out, "3. Large query - all banners, no pagination")?;
    let results = repository.get_list(SearchCriteria::all()).await?;
    writeln!(out, "   Retrieved {} total banners", results.total_count)?;

    if let Some(latency) = repository.latency() {
        let stats = latency.stats();
        writeln!(
            out,
            "   {} queries, {} over {} ms",
            stats.queries,
            stats.slow_queries,
            latency.slow_threshold().as_millis()
        )?;
    }
    Ok(())
}

async fn circuit_breaker<W: Write + Send>(repository: &BannerRepository, out: &mut W) -> Result<()> {
    header(out, "TEST 3: Delete guard")?;

    let Some(guard) = repository.guard() else {
        writeln!(out, "Delete guard is disabled")?;
        return Ok(());
    };
    let threshold = guard.threshold();
    writeln!(out, "Protected banners have sort_order < {threshold}")?;
    writeln!(out)?;

    let all = repository.get_list(SearchCriteria::all()).await?;
    let protected = match all.items.iter().find(|b| b.sort_order < threshold) {
        Some(banner) => banner.clone(),
        None => {
            let pinned = Banner::new("Pinned Announcement", "Created to demonstrate the guard.")
                .with_sort_order(threshold.saturating_sub(1))
                .with_active(false);
            repository.save(pinned).await?
        }
    };

    writeln!(out, "1. Attempt to delete PROTECTED banner")?;
    writeln!(out, "   Banner: \"{}\"", protected.title)?;
    writeln!(out, "   Sort order: {}", protected.sort_order)?;
    match repository.delete(protected).await {
        Ok(_) => writeln!(out, "   UNEXPECTED: deletion succeeded")?,
        Err(e @ RepositoryError::OperationBlocked { .. }) => {
            writeln!(out, "   EXPECTED: deletion blocked")?;
            writeln!(out, "   Error: {e}")?;
        }
        Err(e) => return Err(e).context("deleting protected banner"),
    }

    writeln!(out)?;
    writeln!(out, "2. Attempt to delete UNPROTECTED banner")?;
    let disposable = Banner::new(
        "Test Banner for Guard (Safe to Delete)",
        "This banner is created for testing and will be deleted.",
    )
    .with_sort_order(100)
    .with_active(false);
    let saved = repository.save(disposable).await?;
    writeln!(out, "   Banner: \"{}\"", saved.title)?;
    match repository.delete(saved).await {
        Ok(true) => writeln!(out, "   EXPECTED: deletion approved and completed")?,
        Ok(false) => writeln!(out, "   UNEXPECTED: nothing was deleted")?,
        Err(e) => writeln!(out, "   UNEXPECTED: deletion failed: {e}")?,
    }
    Ok(())
}
