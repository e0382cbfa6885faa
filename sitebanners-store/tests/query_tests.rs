use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use sitebanners_store::query::{filter_matches, like, matches, page_bounds, run};
use sitebanners_types::{
    Banner, BannerField, BannerId, Condition, Filter, FilterValue, SearchCriteria, SortOrder,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

fn saved(id: u64, title: &str) -> Banner {
    Banner::new(title, "").with_id(BannerId::new(id))
}

// ── Conditions ───────────────────────────────────────────────────

#[test]
fn null_only_matches_null_condition() {
    let banner = saved(1, "Open");
    assert!(filter_matches(&Filter::is_null(BannerField::ActiveFrom), &banner));
    assert!(!filter_matches(
        &Filter::new(BannerField::ActiveFrom, Condition::Lteq, now()),
        &banner
    ));
    assert!(!filter_matches(
        &Filter::new(BannerField::ActiveFrom, Condition::Neq, now()),
        &banner
    ));
}

#[test]
fn is_active_matches_numeric_flag() {
    let banner = saved(1, "On");
    assert!(filter_matches(&Filter::eq(BannerField::IsActive, "1"), &banner));
    assert!(filter_matches(&Filter::eq(BannerField::IsActive, 1), &banner));
    assert!(!filter_matches(&Filter::eq(BannerField::IsActive, false), &banner));
}

#[test]
fn in_and_nin() {
    let banner = saved(5, "Five").with_sort_order(20);
    let set = FilterValue::List(vec![10.into(), 20.into()]);
    assert!(filter_matches(
        &Filter::new(BannerField::SortOrder, Condition::In, set.clone()),
        &banner
    ));
    assert!(!filter_matches(
        &Filter::new(BannerField::SortOrder, Condition::Nin, set),
        &banner
    ));
}

#[test]
fn like_is_case_insensitive_with_wildcards() {
    assert!(like("Holiday Sale 2024", "%sale%"));
    assert!(like("Holiday Sale 2024", "holiday%"));
    assert!(like("abc", "a_c"));
    assert!(!like("abc", "a_d"));
    assert!(like("%ba", "%a"));
    assert!(like("", "%"));
    assert!(!like("", "_"));
}

// ── Date window ──────────────────────────────────────────────────

#[test]
fn visible_at_applies_null_aware_window() {
    let banners = vec![
        saved(1, "Always"),
        saved(2, "Current").with_window(Some(now() - Duration::days(1)), Some(now() + Duration::days(1))),
        saved(3, "Future").with_window(Some(now() + Duration::days(1)), None),
        saved(4, "Past").with_window(None, Some(now() - Duration::days(1))),
        saved(5, "Off").with_active(false),
    ];
    let criteria = SearchCriteria::visible_at(now());
    let visible: Vec<u64> = banners
        .iter()
        .filter(|b| matches(&criteria, b))
        .filter_map(|b| b.id.map(|id| id.get()))
        .collect();
    assert_eq!(visible, vec![1, 2]);
}

// ── Sorting & paging ─────────────────────────────────────────────

#[test]
fn nulls_sort_first_ascending() {
    let banners = vec![
        saved(1, "dated").with_window(Some(now()), None),
        saved(2, "open"),
    ];
    let criteria = SearchCriteria::builder()
        .add_sort_order(SortOrder::asc(BannerField::ActiveFrom))
        .build();
    let (items, _) = run(&criteria, &banners);
    assert_eq!(items[0].title, "open");
}

#[test]
fn ties_break_by_id() {
    let banners = vec![saved(3, "c"), saved(1, "a"), saved(2, "b")];
    let criteria = SearchCriteria::builder()
        .add_sort_order(SortOrder::asc(BannerField::SortOrder))
        .build();
    let (items, total) = run(&criteria, &banners);
    assert_eq!(total, 3);
    let ids: Vec<u64> = items.iter().filter_map(|b| b.id).map(|id| id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn page_past_the_end_is_empty() {
    let criteria = SearchCriteria::builder().page_size(10).current_page(3).build();
    assert_eq!(page_bounds(&criteria, 15), 15..15);
}

#[test]
fn zero_page_size_is_unlimited() {
    let criteria = SearchCriteria::builder().page_size(0).build();
    assert_eq!(page_bounds(&criteria, 7), 0..7);
}

proptest! {
    #[test]
    fn pages_partition_the_matches(total in 0usize..200, size in 1usize..25) {
        let mut covered = 0;
        let pages = total.div_ceil(size).max(1);
        for page in 1..=pages {
            let criteria = SearchCriteria::builder().page_size(size).current_page(page).build();
            let range = page_bounds(&criteria, total);
            prop_assert_eq!(range.start, covered);
            covered = range.end;
        }
        prop_assert_eq!(covered, total);
    }

    #[test]
    fn percent_matches_anything(text in "[a-zA-Z0-9 _-]{0,40}") {
        prop_assert!(like(&text, "%"));
        let pattern = format!("%{text}%");
        prop_assert!(like(&text, &pattern));
    }
}
