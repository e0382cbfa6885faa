use crate::BannerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A banner record.
///
/// `id` is `None` until the store assigns one on create. The timestamps
/// `created_at` / `updated_at` are stamped by the store and ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub id: Option<BannerId>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub active_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_is_active() -> bool {
    true
}

impl Banner {
    /// Creates an unsaved, active banner with sort order 0 and no date window.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            is_active: true,
            sort_order: 0,
            active_from: None,
            active_to: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: BannerId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn with_window(
        mut self,
        active_from: Option<DateTime<Utc>>,
        active_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.active_from = active_from;
        self.active_to = active_to;
        self
    }

    /// Returns true if the banner has not been persisted yet.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Returns true if either end of the date window is set.
    pub fn has_date_window(&self) -> bool {
        self.active_from.is_some() || self.active_to.is_some()
    }

    /// Returns true if the window is well-formed (`active_from <= active_to`
    /// when both ends are set).
    pub fn has_valid_window(&self) -> bool {
        match (self.active_from, self.active_to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }

    /// Classifies the banner relative to `now`.
    pub fn display_status(&self, now: DateTime<Utc>) -> DisplayStatus {
        if !self.is_active {
            return DisplayStatus::Inactive;
        }
        if self.active_from.is_some_and(|from| from > now) {
            return DisplayStatus::Scheduled;
        }
        if self.active_to.is_some_and(|to| to < now) {
            return DisplayStatus::Expired;
        }
        DisplayStatus::Active
    }

    /// Whole days until `active_to`, rounded up. Negative once expired.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        let to = self.active_to?;
        let seconds = (to - now).num_seconds() as f64;
        Some((seconds / SECONDS_PER_DAY).ceil() as i64)
    }

    /// Returns true if the banner should be shown on the storefront at `now`.
    /// Window bounds are inclusive.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.display_status(now) == DisplayStatus::Active
    }
}

/// Where a banner sits in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    /// Manually disabled.
    Inactive,
    /// Enabled but the window has not opened yet.
    Scheduled,
    /// Enabled but the window has closed.
    Expired,
    /// Enabled and inside its window (or without one).
    Active,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Inactive => "inactive",
            Self::Scheduled => "scheduled",
            Self::Expired => "expired",
            Self::Active => "active",
        };
        f.write_str(label)
    }
}
