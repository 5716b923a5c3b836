//! Core types and logic for the icsync ecosystem.
//!
//! This crate holds everything that is independent of the concrete
//! remote calendar service:
//! - `Event` and related types in the remote-API-shaped canonical form
//! - the reconciliation engine (`reconcile`, `partition`, `recency`)
//! - the `SyncEngine` orchestrator and the `RemoteCalendar` trait it
//!   drives
//! - the `.ics` → `Event` converter

pub mod error;
pub mod event;
pub mod ics;
pub mod partition;
pub mod recency;
pub mod reconcile;
pub mod remote;
pub mod sync;

pub use error::{SyncError, SyncResult};
pub use event::{Event, EventTime};
pub use remote::{BatchAction, FoundEvents, ItemResult, RemoteCalendar};
pub use sync::{SyncEngine, SyncPlan, SyncReport};
