//! Invalidation router.
//!
//! Maps row changes to the cache-key prefixes whose queries may now be
//! stale and coalesces bursts per prefix: every prefix has at most one
//! pending invalidation, and each new event touching it pushes the fire time
//! back by the debounce window. When an entry fires the cache is told to
//! invalidate the prefix and refetch its active queries.
//!
//! All pending fire times live in one [`DelayQueue`]; the owner drives it
//! through [`InvalidationRouter::next_due`].


use std::collections::HashMap;
use std::future::poll_fn;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use tokio_util::time::delay_queue;
use tokio_util::time::DelayQueue;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::constants::MAX_DEBOUNCE_MS;
use crate::insert_toast;
use crate::query_keys::*;
use crate::CacheKeyPrefix;
use crate::ChangeEvent;
use crate::InvalidationConfig;
use crate::Notifier;
use crate::QueryCache;
use crate::TableId;

/// Cache-key prefixes a change on `event.table` may have made stale
pub fn route(event: &ChangeEvent) -> Vec<CacheKeyPrefix> {
    let roots: &[&str] = match &event.table {
        TableId::Equipment => &[
            EQUIPMENT,
            DASHBOARD_STATS,
            REPORTS,
            EQUIPMENT_DISTRIBUTION,
            EQUIPMENT_HISTORY,
        ],
        TableId::TransferRequests => &[TRANSFERS, EQUIPMENT, REPORTS, DASHBOARD_STATS],
        TableId::TransferHistory => &[TRANSFER_HISTORY, TRANSFERS],
        TableId::RepairRequests => &[REPAIR_REQUESTS, EQUIPMENT, DASHBOARD_STATS, REPORTS],
        TableId::MaintenancePlans => &[MAINTENANCE_PLANS, DASHBOARD_STATS, REPORTS],
        TableId::MaintenanceTasks => &[MAINTENANCE_TASKS, MAINTENANCE_PLANS, DASHBOARD_STATS],
        TableId::Staff => &[USERS],
        TableId::UsageLogs => &[USAGE_LOGS, EQUIPMENT],
        TableId::EquipmentHistory => &[EQUIPMENT_HISTORY],
        TableId::Departments => &[DEPARTMENTS, EQUIPMENT_DISTRIBUTION],
        TableId::Unknown(name) => {
            warn!(table = %name, kind = %event.kind, "change on unwatched table ignored");
            &[]
        }
    };

    roots.iter().map(|root| CacheKeyPrefix::root(root)).collect()
}

#[derive(Debug)]
struct PendingInvalidation {
    key: delay_queue::Key,
    prefix: CacheKeyPrefix,
}

pub struct InvalidationRouter {
    cache: Arc<dyn QueryCache>,
    notifier: Arc<dyn Notifier>,
    debounce: Duration,
    notify_on_insert: bool,
    queue: DelayQueue<String>,
    /// serialised prefix -> queue entry
    pending: HashMap<String, PendingInvalidation>,
    last_update: Option<SystemTime>,
}

impl InvalidationRouter {
    pub fn new(
        cache: Arc<dyn QueryCache>,
        notifier: Arc<dyn Notifier>,
        config: &InvalidationConfig,
    ) -> Self {
        Self {
            cache,
            notifier,
            debounce: config.debounce(),
            notify_on_insert: config.notify_on_insert,
            queue: DelayQueue::new(),
            pending: HashMap::new(),
            last_update: None,
        }
    }

    /// Toasts new rows and schedules every prefix the change touches
    pub fn handle_event(
        &mut self,
        event: &ChangeEvent,
    ) {
        trace!(table = %event.table, kind = %event.kind, "routing change");

        if self.notify_on_insert {
            if let Some(toast) = insert_toast(event) {
                self.notifier.notify(toast);
            }
        }

        let prefixes = route(event);
        self.schedule_invalidate(prefixes, self.debounce);
    }

    /// Schedules each prefix to fire after `delay`, pushing back any entry
    /// already pending for it.
    ///
    /// `delay` is capped at one hour.
    pub fn schedule_invalidate(
        &mut self,
        prefixes: Vec<CacheKeyPrefix>,
        delay: Duration,
    ) {
        let delay = delay.min(Duration::from_millis(MAX_DEBOUNCE_MS));
        for prefix in prefixes {
            let id = prefix.serialized();
            match self.pending.get(&id) {
                Some(entry) => {
                    self.queue.reset(&entry.key, delay);
                    trace!(prefix = %id, "invalidation rescheduled");
                }
                None => {
                    let key = self.queue.insert(id.clone(), delay);
                    trace!(prefix = %id, "invalidation scheduled");
                    self.pending.insert(id, PendingInvalidation { key, prefix });
                }
            }
        }
    }

    /// Resolves with the next prefix whose window elapsed.
    ///
    /// Never resolves while nothing is pending, so it can sit in a
    /// `select!` next to other branches.
    pub async fn next_due(&mut self) -> CacheKeyPrefix {
        loop {
            if self.queue.is_empty() {
                std::future::pending::<()>().await;
            }

            let Some(expired) = poll_fn(|cx| self.queue.poll_expired(cx)).await else {
                continue;
            };
            if let Some(entry) = self.pending.remove(expired.get_ref()) {
                return entry.prefix;
            }
        }
    }

    /// Invalidates `prefix`, refetches its active queries and stamps
    /// `last_update`.
    pub fn fire(
        &mut self,
        prefix: &CacheKeyPrefix,
    ) {
        debug!(%prefix, "invalidating cached queries");
        self.cache.invalidate(prefix);
        self.cache.refetch_active(prefix);
        self.last_update = Some(SystemTime::now());
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(
        &self,
        prefix: &CacheKeyPrefix,
    ) -> bool {
        self.pending.contains_key(&prefix.serialized())
    }

    /// Drops every pending invalidation without firing it
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            debug!(pending = self.pending.len(), "dropping pending invalidations");
        }
        self.queue.clear();
        self.pending.clear();
    }

    pub fn last_update(&self) -> Option<SystemTime> {
        self.last_update
    }
}
