//! In-process evaluation of [`SearchCriteria`].

use sitebanners_types::{
    Banner, Condition, Filter, FilterValue, SearchCriteria, SortDirection, SortOrder,
};
use std::cmp::Ordering;
use std::ops::Range;

/// Returns true if the banner satisfies every filter group.
/// An empty group matches everything.
pub fn matches(criteria: &SearchCriteria, banner: &Banner) -> bool {
    criteria
        .filter_groups
        .iter()
        .all(|group| group.filters.is_empty() || group.filters.iter().any(|f| filter_matches(f, banner)))
}

/// Evaluates a single filter against a banner.
pub fn filter_matches(filter: &Filter, banner: &Banner) -> bool {
    let actual = filter.field.value_of(banner);
    let ord = || actual.loose_cmp(&filter.value);
    match filter.condition {
        Condition::Null => actual.is_null(),
        Condition::Notnull => !actual.is_null(),
        Condition::Eq => ord() == Some(Ordering::Equal),
        Condition::Neq => matches!(ord(), Some(Ordering::Less | Ordering::Greater)),
        Condition::Lt => ord() == Some(Ordering::Less),
        Condition::Lteq => matches!(ord(), Some(Ordering::Less | Ordering::Equal)),
        Condition::Gt => ord() == Some(Ordering::Greater),
        Condition::Gteq => matches!(ord(), Some(Ordering::Greater | Ordering::Equal)),
        Condition::Like => match (actual.as_text(), filter.value.as_text()) {
            (Some(text), Some(pattern)) => like(&text, &pattern),
            _ => false,
        },
        Condition::In => contains(&filter.value, &actual),
        Condition::Nin => !actual.is_null() && !contains(&filter.value, &actual),
    }
}

fn contains(set: &FilterValue, actual: &FilterValue) -> bool {
    match set {
        FilterValue::List(items) => items
            .iter()
            .any(|item| actual.loose_cmp(item) == Some(Ordering::Equal)),
        single => actual.loose_cmp(single) == Some(Ordering::Equal),
    }
}

/// Case-insensitive SQL `LIKE`.
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    // Classic two-pointer wildcard match with backtracking to the last `%`.
    let (mut t, mut p) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// Orders two banners by the criteria's sort orders, then by id.
/// NULLs sort first in ascending order.
pub fn compare(sort_orders: &[SortOrder], a: &Banner, b: &Banner) -> Ordering {
    for order in sort_orders {
        let ord = compare_values(&order.field.value_of(a), &order.field.value_of(b));
        let ord = match order.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.id.cmp(&b.id)
}

fn compare_values(a: &FilterValue, b: &FilterValue) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.loose_cmp(b).unwrap_or(Ordering::Equal),
    }
}

/// Index range of the requested page within `total` sorted matches.
/// A page size of `None` or `0` means unlimited.
pub fn page_bounds(criteria: &SearchCriteria, total: usize) -> Range<usize> {
    match criteria.page_size {
        None | Some(0) => 0..total,
        Some(size) => {
            let page = criteria.current_page.max(1);
            let start = size.saturating_mul(page - 1).min(total);
            let end = start.saturating_add(size).min(total);
            start..end
        }
    }
}

/// Filters, sorts and pages an iterator of banners.
/// Returns the page and the total number of matches.
pub fn run<'a>(
    criteria: &SearchCriteria,
    banners: impl IntoIterator<Item = &'a Banner>,
) -> (Vec<Banner>, usize) {
    let mut hits: Vec<&Banner> = banners
        .into_iter()
        .filter(|banner| matches(criteria, banner))
        .collect();
    hits.sort_by(|a, b| compare(&criteria.sort_orders, a, b));
    let total = hits.len();
    let page = hits[page_bounds(criteria, total)]
        .iter()
        .map(|banner| (*banner).clone())
        .collect();
    (page, total)
}
