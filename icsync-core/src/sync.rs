//! Sync orchestration.
//!
//! A sync pass has two phases: `prepare` computes the full plan
//! (insert/update/delete sets) without touching the remote store, and
//! `apply` executes it. The plan is passed by value between the two,
//! so there is no half-prepared engine state to misuse: either
//! `prepare` returns a complete plan or it returns an error.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::SyncResult;
use crate::event::Event;
use crate::partition::split_by_start;
use crate::recency::filter_stale;
use crate::reconcile::compare;
use crate::remote::{BatchAction, ItemResult, RemoteCalendar};

/// The pending-action sets of one prepared sync pass.
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub to_insert: Vec<Event>,
    pub to_update: Vec<(Event, Event)>,
    pub to_delete: Vec<Event>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// One item that failed inside an applied batch.
#[derive(Debug)]
pub struct FailedItem {
    pub action: BatchAction,
    pub uid: String,
    pub reason: String,
}

/// Aggregate outcome of an applied sync pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: Vec<FailedItem>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fold one batch's per-item results in, returning the success count.
    fn absorb(&mut self, action: BatchAction, results: Vec<ItemResult>) -> usize {
        let mut ok = 0;
        for result in results {
            match result.outcome {
                Ok(()) => ok += 1,
                Err(error) => self.failed.push(FailedItem {
                    action,
                    uid: result.event.log_key().to_string(),
                    reason: error.to_string(),
                }),
            }
        }
        ok
    }
}

/// Drives one remote calendar through prepare/apply passes.
pub struct SyncEngine<C> {
    remote: C,
}

impl<C: RemoteCalendar> SyncEngine<C> {
    pub fn new(remote: C) -> Self {
        SyncEngine { remote }
    }

    pub fn remote(&self) -> &C {
        &self.remote
    }

    /// Compute the plan that converges the remote calendar onto
    /// `source`, without mutating anything.
    ///
    /// Pipeline: list the remote from `boundary`, partition the source
    /// around it, reconcile pending-vs-remote, rescue source events
    /// that moved into the past from the delete set into the update
    /// set, reclassify insert candidates that already exist remotely,
    /// then drop stale updates.
    pub async fn prepare(
        &self,
        source: Vec<Event>,
        boundary: DateTime<Utc>,
    ) -> SyncResult<SyncPlan> {
        let remote_events = self.remote.list_events_from(boundary).await?;
        let (pending, past) = split_by_start(source, boundary)?;

        let first = compare(pending, remote_events)?;
        let mut to_update = first.to_update;

        // A source event that slipped behind the boundary still exists
        // remotely as a delete candidate; update it in place rather
        // than deleting it. Past source events with no remote
        // counterpart are left alone.
        let rescued = compare(past, first.to_delete)?;
        to_update.extend(rescued.to_update);
        let to_delete = rescued.to_delete;

        // Insert candidates may exist remotely after all (including
        // soft-deleted records); those become updates so the logical
        // event is revived instead of duplicated.
        let found = self.remote.find_existing(first.to_insert).await?;
        to_update.extend(found.exists);
        let to_insert = found.missing;

        let to_update = filter_stale(to_update);

        info!(
            insert = to_insert.len(),
            update = to_update.len(),
            delete = to_delete.len(),
            "prepared to sync"
        );

        Ok(SyncPlan {
            to_insert,
            to_update,
            to_delete,
        })
    }

    /// Execute a prepared plan: insert, then update, then delete.
    ///
    /// The order is load-bearing: inserts must land before the same
    /// records can be the old side of a later pass, and deletes run
    /// last so a misclassified record is never removed before its
    /// replacement is confirmed. Per-item failures end up in the
    /// report; a whole-batch transport failure propagates as `Err`.
    pub async fn apply(&self, plan: SyncPlan) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        let results = self.remote.insert_events(plan.to_insert).await?;
        report.inserted = report.absorb(BatchAction::Insert, results);

        let results = self.remote.update_events(plan.to_update).await?;
        report.updated = report.absorb(BatchAction::Update, results);

        let results = self.remote.delete_events(plan.to_delete).await?;
        report.deleted = report.absorb(BatchAction::Delete, results);

        info!(
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failed.len(),
            "sync done"
        );

        Ok(report)
    }
}
