//! Search criteria and result envelopes for `get_list`.
//!
//! Criteria are plain data: the store evaluates them, interceptors only look
//! at them (for logging) or pass them through.

use crate::{Banner, DisplayStatus, Error};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A filterable / sortable banner column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerField {
    Id,
    Title,
    Content,
    IsActive,
    SortOrder,
    ActiveFrom,
    ActiveTo,
    CreatedAt,
    UpdatedAt,
}

impl BannerField {
    /// Column name as used in criteria and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Content => "content",
            Self::IsActive => "is_active",
            Self::SortOrder => "sort_order",
            Self::ActiveFrom => "active_from",
            Self::ActiveTo => "active_to",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Parses a column name. Accepts `banner_id` as an alias for `id`.
    pub fn parse(name: &str) -> crate::Result<Self> {
        match name {
            "id" | "banner_id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "content" => Ok(Self::Content),
            "is_active" => Ok(Self::IsActive),
            "sort_order" => Ok(Self::SortOrder),
            "active_from" => Ok(Self::ActiveFrom),
            "active_to" => Ok(Self::ActiveTo),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            other => Err(Error::UnknownField(other.to_string())),
        }
    }

    /// Reads this column from a banner.
    pub fn value_of(&self, banner: &Banner) -> FilterValue {
        match self {
            Self::Id => banner
                .id
                .map_or(FilterValue::Null, |id| FilterValue::Int(id.get() as i64)),
            Self::Title => FilterValue::Text(banner.title.clone()),
            Self::Content => FilterValue::Text(banner.content.clone()),
            Self::IsActive => FilterValue::Bool(banner.is_active),
            Self::SortOrder => FilterValue::Int(i64::from(banner.sort_order)),
            Self::ActiveFrom => banner.active_from.into(),
            Self::ActiveTo => banner.active_to.into(),
            Self::CreatedAt => banner.created_at.into(),
            Self::UpdatedAt => banner.updated_at.into(),
        }
    }
}

impl fmt::Display for BannerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Eq,
    Neq,
    Lt,
    Lteq,
    Gt,
    Gteq,
    /// SQL-style pattern: `%` matches any run, `_` a single character.
    Like,
    In,
    Nin,
    Null,
    Notnull,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lteq => "<=",
            Self::Gt => ">",
            Self::Gteq => ">=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Nin => "NOT IN",
            Self::Null => "IS NULL",
            Self::Notnull => "IS NOT NULL",
        };
        f.write_str(op)
    }
}

/// A filter operand (or a column value read from a banner).
///
/// Deserializes from plain JSON: `null`, booleans, integers, RFC 3339
/// strings (as timestamps), other strings, and arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            Self::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// Renders scalar values as text for pattern matching.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null | Self::List(_) => None,
            Self::Bool(b) => Some(if *b { "1".into() } else { "0".into() }),
            Self::Int(i) => Some(i.to_string()),
            Self::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Compares two values with loose coercion (bool ↔ int, text ↔ number,
    /// text ↔ timestamp). Returns `None` when either side is NULL or the
    /// values are not comparable.
    pub fn loose_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::List(_), _) | (_, Self::List(_)) => None,
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), b) => b.as_timestamp().map(|b| a.cmp(&b)),
            (a, Self::Timestamp(b)) => a.as_timestamp().map(|a| a.cmp(b)),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }
}

impl From<Option<DateTime<Utc>>> for FilterValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Null, Self::Timestamp)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            other => f.write_str(&other.as_text().unwrap_or_default()),
        }
    }
}

/// Parses RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A single `field <condition> value` test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: BannerField,
    #[serde(default = "default_condition")]
    pub condition: Condition,
    #[serde(default = "default_value")]
    pub value: FilterValue,
}

fn default_condition() -> Condition {
    Condition::Eq
}

fn default_value() -> FilterValue {
    FilterValue::Null
}

impl Filter {
    pub fn new(field: BannerField, condition: Condition, value: impl Into<FilterValue>) -> Self {
        Self {
            field,
            condition,
            value: value.into(),
        }
    }

    pub fn eq(field: BannerField, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Condition::Eq, value)
    }

    pub fn is_null(field: BannerField) -> Self {
        Self::new(field, Condition::Null, FilterValue::Null)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.condition {
            Condition::Null | Condition::Notnull => write!(f, "{} {}", self.field, self.condition),
            _ => write!(f, "{} {} {}", self.field, self.condition, self.value),
        }
    }
}

/// Filters that are ORed together. Groups themselves are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
}

impl FilterGroup {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: BannerField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn asc(field: BannerField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: BannerField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

/// A query descriptor for `get_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default)]
    pub filter_groups: Vec<FilterGroup>,
    #[serde(default)]
    pub sort_orders: Vec<SortOrder>,
    /// `None` means unlimited.
    #[serde(default)]
    pub page_size: Option<usize>,
    /// 1-based.
    #[serde(default = "default_page")]
    pub current_page: usize,
}

fn default_page() -> usize {
    1
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            filter_groups: Vec::new(),
            sort_orders: Vec::new(),
            page_size: None,
            current_page: 1,
        }
    }
}

impl SearchCriteria {
    /// Matches every banner, unsorted, unpaged.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    /// Enabled banners whose date window contains `now`, ordered by
    /// sort order. Open window ends (NULL) always match.
    pub fn visible_at(now: DateTime<Utc>) -> Self {
        Self::builder()
            .add_filter(Filter::eq(BannerField::IsActive, true))
            .add_filter_group(vec![
                Filter::is_null(BannerField::ActiveFrom),
                Filter::new(BannerField::ActiveFrom, Condition::Lteq, now),
            ])
            .add_filter_group(vec![
                Filter::is_null(BannerField::ActiveTo),
                Filter::new(BannerField::ActiveTo, Condition::Gteq, now),
            ])
            .add_sort_order(SortOrder::asc(BannerField::SortOrder))
            .build()
    }

    /// Number of individual filters across all groups.
    pub fn filter_count(&self) -> usize {
        self.filter_groups.iter().map(|g| g.filters.len()).sum()
    }

    /// Human-readable rendering of the filter tree, for logs.
    pub fn describe_filters(&self) -> String {
        let groups: Vec<String> = self
            .filter_groups
            .iter()
            .filter(|g| !g.filters.is_empty())
            .map(|g| {
                let parts: Vec<String> = g.filters.iter().map(ToString::to_string).collect();
                if parts.len() == 1 {
                    parts.join("")
                } else {
                    format!("({})", parts.join(" OR "))
                }
            })
            .collect();
        if groups.is_empty() {
            "no filters".to_string()
        } else {
            groups.join(" AND ")
        }
    }
}

/// Fluent builder for [`SearchCriteria`].
#[derive(Debug, Default, Clone)]
pub struct SearchCriteriaBuilder {
    criteria: SearchCriteria,
}

impl SearchCriteriaBuilder {
    /// Adds a filter as its own AND-ed group.
    #[must_use]
    pub fn add_filter(mut self, filter: Filter) -> Self {
        self.criteria.filter_groups.push(FilterGroup::new(vec![filter]));
        self
    }

    /// Adds a group of OR-ed filters.
    #[must_use]
    pub fn add_filter_group(mut self, filters: Vec<Filter>) -> Self {
        self.criteria.filter_groups.push(FilterGroup::new(filters));
        self
    }

    #[must_use]
    pub fn add_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.criteria.sort_orders.push(sort_order);
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.criteria.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn current_page(mut self, page: usize) -> Self {
        self.criteria.current_page = page.max(1);
        self
    }

    pub fn build(self) -> SearchCriteria {
        self.criteria
    }
}

/// The envelope returned by `get_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub items: Vec<Banner>,
    /// Matches before pagination.
    pub total_count: usize,
    pub criteria: SearchCriteria,
    /// Filled in by the result enhancer when it is installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ListStatistics>,
}

/// Lifecycle breakdown of a result page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStatistics {
    pub active: usize,
    pub scheduled: usize,
    pub expired: usize,
    pub inactive: usize,
    /// Enabled banners with at least one window end set.
    pub with_dates: usize,
    /// Enabled banners without a window.
    pub without_dates: usize,
}

impl ListStatistics {
    pub fn from_banners<'a>(banners: impl IntoIterator<Item = &'a Banner>, now: DateTime<Utc>) -> Self {
        let mut stats = Self::default();
        for banner in banners {
            let status = banner.display_status(now);
            if status == DisplayStatus::Inactive {
                stats.inactive += 1;
                continue;
            }
            if banner.has_date_window() {
                stats.with_dates += 1;
            } else {
                stats.without_dates += 1;
            }
            match status {
                DisplayStatus::Scheduled => stats.scheduled += 1,
                DisplayStatus::Expired => stats.expired += 1,
                _ => stats.active += 1,
            }
        }
        stats
    }
}
