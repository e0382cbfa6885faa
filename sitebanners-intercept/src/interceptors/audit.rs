//! Audit trail for writes.

use crate::{Call, CallContext, Interceptor, Outcome, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sitebanners_types::{BannerId, Clock, SystemClock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub const DEFAULT_AUDIT_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    DeleteById,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::DeleteById => "DELETE_BY_ID",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Logged before the store saw the call; the result is not known yet.
    Attempted,
    Succeeded,
    /// The store reported `false`.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub at: DateTime<Utc>,
    pub action: AuditAction,
    pub banner_id: Option<BannerId>,
    pub title: Option<String>,
    pub is_active: Option<bool>,
    pub status: AuditStatus,
}

/// Before `save`; after `delete` and `delete_by_id`.
///
/// Observes only. Keeps the most recent `capacity` records in memory and
/// mirrors each one as a `tracing` event.
pub struct AuditLog {
    clock: Arc<dyn Clock>,
    capacity: usize,
    trail: Mutex<VecDeque<AuditRecord>>,
}

impl AuditLog {
    pub fn new(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        Self {
            clock,
            capacity: capacity.max(1),
            trail: Mutex::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.trail().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.trail().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail().is_empty()
    }

    fn trail(&self) -> MutexGuard<'_, VecDeque<AuditRecord>> {
        self.trail.lock().unwrap_or_else(|poisoned| {
            warn!("[AUDIT] Trail lock poisoned, continuing with what it holds");
            self.trail.clear_poison();
            poisoned.into_inner()
        })
    }

    fn push(&self, record: AuditRecord) {
        let mut trail = self.trail();
        while trail.len() >= self.capacity {
            trail.pop_front();
        }
        trail.push_back(record);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), DEFAULT_AUDIT_CAPACITY)
    }
}

#[async_trait]
impl Interceptor for AuditLog {
    fn name(&self) -> &str {
        "audit_log"
    }

    async fn before(&self, _ctx: &CallContext, call: Call) -> RepositoryResult<Call> {
        let Call::Save(banner) = &call else {
            return Ok(call);
        };
        let action = if banner.is_new() {
            AuditAction::Create
        } else {
            AuditAction::Update
        };
        let shown_id = banner.id.map_or_else(|| "NEW".to_string(), |id| id.to_string());

        info!(
            operation = %action,
            banner_id = %shown_id,
            title = %banner.title,
            is_active = banner.is_active,
            sort_order = banner.sort_order,
            active_from = ?banner.active_from,
            active_to = ?banner.active_to,
            "Banner {} operation initiated: \"{}\" (ID: {})",
            action,
            banner.title,
            shown_id
        );
        if !banner.is_active {
            warn!(banner_id = ?banner.id, "Banner \"{}\" is being deactivated", banner.title);
        }

        self.push(AuditRecord {
            at: self.clock.now(),
            action,
            banner_id: banner.id,
            title: Some(banner.title.clone()),
            is_active: Some(banner.is_active),
            status: AuditStatus::Attempted,
        });
        Ok(call)
    }

    async fn after(&self, _ctx: &CallContext, call: &Call, outcome: &mut Outcome) -> anyhow::Result<()> {
        let (action, banner_id, title) = match call {
            Call::Delete(banner) => (AuditAction::Delete, banner.id, Some(banner.title.clone())),
            Call::DeleteById(id) => (AuditAction::DeleteById, Some(*id), None),
            _ => return Ok(()),
        };
        let Outcome::Deleted(deleted) = outcome else {
            anyhow::bail!("{action} finished with a non-boolean outcome");
        };

        let status = if *deleted {
            info!(
                banner_id = ?banner_id,
                title = ?title,
                operation = %action,
                success = true,
                "Banner successfully deleted"
            );
            AuditStatus::Succeeded
        } else {
            warn!(
                banner_id = ?banner_id,
                title = ?title,
                operation = %action,
                success = false,
                "Banner deletion returned false"
            );
            AuditStatus::Failed
        };

        self.push(AuditRecord {
            at: self.clock.now(),
            action,
            banner_id,
            title,
            is_active: None,
            status,
        });
        Ok(())
    }
}
