//! The boundary between the sync engine and a remote calendar store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{SyncError, SyncResult};
use crate::event::Event;

/// The batched mutation kinds a remote store supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Insert,
    Patch,
    Update,
    Delete,
}

impl BatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchAction::Insert => "insert",
            BatchAction::Patch => "patch",
            BatchAction::Update => "update",
            BatchAction::Delete => "delete",
        }
    }
}

/// Outcome of one item inside a batched call.
///
/// Per-item failures never abort sibling items; a failure of the whole
/// batched call is an `Err` from the trait method instead.
#[derive(Debug)]
pub struct ItemResult {
    pub event: Event,
    pub outcome: Result<(), SyncError>,
}

impl ItemResult {
    pub fn ok(event: Event) -> Self {
        ItemResult {
            event,
            outcome: Ok(()),
        }
    }

    pub fn failed(event: Event, error: SyncError) -> Self {
        ItemResult {
            event,
            outcome: Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Result of probing insert candidates for prior existence.
#[derive(Debug, Default)]
pub struct FoundEvents {
    /// (candidate, first remote match) pairs for events that already
    /// exist remotely, including soft-deleted ones.
    pub exists: Vec<(Event, Event)>,
    /// Candidates with no remote match (or whose lookup errored).
    pub missing: Vec<Event>,
}

/// A mutable remote calendar store.
///
/// Authentication, transport, and batching mechanics are entirely the
/// implementor's concern; the engine only relies on per-item results
/// and on listing/probing semantics.
#[async_trait]
pub trait RemoteCalendar {
    /// List events whose start is at or after `start`. Only `id`,
    /// `iCalUID` and `updated` are required to be populated.
    async fn list_events_from(&self, start: DateTime<Utc>) -> SyncResult<Vec<Event>>;

    /// Look up each candidate by iCalUID, including soft-deleted
    /// records, in one batched round trip. A per-lookup error counts
    /// as "missing" (fail-open toward insert).
    async fn find_existing(&self, candidates: Vec<Event>) -> SyncResult<FoundEvents>;

    async fn insert_events(&self, events: Vec<Event>) -> SyncResult<Vec<ItemResult>>;

    /// Partial update of (new, old) pairs. Pairs whose old side has no
    /// remote id are skipped: nothing exists to patch.
    async fn patch_events(&self, pairs: Vec<(Event, Event)>) -> SyncResult<Vec<ItemResult>>;

    /// Full replacement of (new, old) pairs; same skip rule as
    /// [`patch_events`](Self::patch_events).
    async fn update_events(&self, pairs: Vec<(Event, Event)>) -> SyncResult<Vec<ItemResult>>;

    async fn delete_events(&self, events: Vec<Event>) -> SyncResult<Vec<ItemResult>>;
}
