//! Event list comparison.
//!
//! Classifies two event collections into the insert/update/delete sets
//! needed to converge the destination onto the source. Pure; the only
//! failure mode is a data-contract violation on the inputs.

use std::collections::BTreeSet;

use crate::error::{SyncError, SyncResult};
use crate::event::Event;

/// Result of comparing a source collection against a destination.
///
/// The three sets are disjoint by key. Update entries pair the source
/// record (new) with the destination record (old) sharing its iCalUID.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub to_insert: Vec<Event>,
    pub to_update: Vec<(Event, Event)>,
    pub to_delete: Vec<Event>,
}

/// Compare `source` against `dest` by iCalUID.
///
/// Keys present only in `source` land in `to_insert`, only in `dest`
/// in `to_delete`, and in both in `to_update`. The update pairing
/// sorts each side's matching records by key and zips them
/// positionally, so the input ordering never affects which records get
/// paired. An empty or duplicated key on either side is an error.
pub fn compare(source: Vec<Event>, dest: Vec<Event>) -> SyncResult<Reconciliation> {
    let keys_src = key_set(&source)?;
    let keys_dst = key_set(&dest)?;

    let mut result = Reconciliation::default();
    let mut upd_src = Vec::new();
    let mut upd_dst = Vec::new();

    for event in source {
        if keys_dst.contains(event.ical_uid.as_str()) {
            upd_src.push(event);
        } else {
            result.to_insert.push(event);
        }
    }
    for event in dest {
        if keys_src.contains(event.ical_uid.as_str()) {
            upd_dst.push(event);
        } else {
            result.to_delete.push(event);
        }
    }

    upd_src.sort_by(|a, b| a.ical_uid.cmp(&b.ical_uid));
    upd_dst.sort_by(|a, b| a.ical_uid.cmp(&b.ical_uid));
    debug_assert_eq!(upd_src.len(), upd_dst.len());
    result.to_update = upd_src.into_iter().zip(upd_dst).collect();

    Ok(result)
}

/// Collect the key set of one side, rejecting empty and duplicate UIDs.
fn key_set(events: &[Event]) -> SyncResult<BTreeSet<String>> {
    let mut keys = BTreeSet::new();
    for event in events {
        if event.ical_uid.is_empty() {
            return Err(SyncError::MissingUid);
        }
        if !keys.insert(event.ical_uid.clone()) {
            return Err(SyncError::DuplicateUid(event.ical_uid.clone()));
        }
    }
    Ok(keys)
}
