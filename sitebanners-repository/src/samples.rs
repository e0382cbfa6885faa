//! Demo content for a fresh install.

use crate::BannerRepository;
use chrono::{TimeZone, Utc};
use sitebanners_intercept::RepositoryResult;
use sitebanners_types::Banner;
use tracing::info;

/// The stock banners of a fresh install. None of them is protected from
/// deletion by the default guard threshold.
pub fn sample_banners() -> Vec<Banner> {
    let at = |y: i32, m: u32, d: u32, h: u32, min: u32, s: u32| {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).single()
    };
    vec![
        Banner::new(
            "Welcome Banner",
            "Welcome to our store! Enjoy browsing our latest products and special offers.",
        )
        .with_sort_order(10),
        Banner::new(
            "Holiday Sale 2024",
            "Get 30% off on all items this holiday season! Limited time offer.",
        )
        .with_sort_order(20)
        .with_window(at(2024, 12, 1, 0, 0, 0), at(2024, 12, 31, 23, 59, 59)),
        Banner::new(
            "Spring Promotion 2026",
            "Fresh new arrivals for Spring 2026. Check them out now!",
        )
        .with_sort_order(30)
        .with_window(at(2026, 3, 1, 0, 0, 0), at(2026, 3, 31, 23, 59, 59)),
        Banner::new(
            "Flash Sale - Inactive",
            "Limited time flash sale - up to 50% off! (Currently inactive)",
        )
        .with_sort_order(40)
        .with_active(false),
        Banner::new(
            "Expired Limited Time Offer",
            "Special offer that has now expired. Demonstrating past date handling.",
        )
        .with_sort_order(50)
        .with_window(at(2024, 1, 1, 0, 0, 0), at(2024, 1, 31, 23, 59, 59)),
    ]
}

impl BannerRepository {
    /// Saves [`sample_banners`] through the full chain.
    pub async fn seed_sample_banners(&self) -> RepositoryResult<Vec<Banner>> {
        let mut saved = Vec::new();
        for banner in sample_banners() {
            let banner = self.save(banner).await?;
            info!(banner_id = ?banner.id, "Sample banner \"{}\" created successfully", banner.title);
            saved.push(banner);
        }
        Ok(saved)
    }
}
