//! Recency guard over the update set.

use crate::event::Event;

/// Drop update pairs whose source side is not strictly newer than the
/// destination side, by `updated` timestamp.
///
/// A pair with a missing timestamp on either side is always kept:
/// staleness cannot be proven, so the source wins. Equal timestamps
/// are dropped, which is what makes a repeated sync against a
/// converged calendar a no-op.
pub fn filter_stale(pairs: Vec<(Event, Event)>) -> Vec<(Event, Event)> {
    pairs
        .into_iter()
        .filter(|(new, old)| match (new.updated, old.updated) {
            (Some(new_at), Some(old_at)) => new_at > old_at,
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ev(uid: &str, updated: Option<DateTime<Utc>>) -> Event {
        Event {
            ical_uid: uid.to_string(),
            updated,
            ..Default::default()
        }
    }

    #[test]
    fn newer_source_is_kept() {
        let old_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let new_at = old_at + chrono::Duration::hours(5);
        let kept = filter_stale(vec![(ev("a", Some(new_at)), ev("a", Some(old_at)))]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn equal_and_older_sources_are_dropped() {
        let at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let newer = at + chrono::Duration::hours(1);

        assert!(filter_stale(vec![(ev("eq", Some(at)), ev("eq", Some(at)))]).is_empty());
        assert!(filter_stale(vec![(ev("old", Some(at)), ev("old", Some(newer)))]).is_empty());
    }

    #[test]
    fn missing_timestamp_always_applies() {
        let at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(filter_stale(vec![(ev("a", None), ev("a", Some(at)))]).len(), 1);
        assert_eq!(filter_stale(vec![(ev("b", Some(at)), ev("b", None))]).len(), 1);
        assert_eq!(filter_stale(vec![(ev("c", None), ev("c", None))]).len(), 1);
    }
}
