//! Temporal partitioning of source events around the sync boundary.

use chrono::{DateTime, Utc};

use crate::error::{SyncError, SyncResult};
use crate::event::{Event, EventTime};

/// Split `events` into (pending, past) relative to `boundary`.
///
/// Pending means the start is at or after the boundary. All-day events
/// compare calendar dates only, with the boundary truncated to its UTC
/// date, so a sub-day boundary time never reclassifies them; timed
/// events compare full instants.
pub fn split_by_start(
    events: Vec<Event>,
    boundary: DateTime<Utc>,
) -> SyncResult<(Vec<Event>, Vec<Event>)> {
    let mut pending = Vec::new();
    let mut past = Vec::new();
    for event in events {
        if starts_at_or_after(&event, boundary)? {
            pending.push(event);
        } else {
            past.push(event);
        }
    }
    Ok((pending, past))
}

/// Whether `event` starts at or after `boundary` under the dual
/// date/instant comparison rule.
pub fn starts_at_or_after(event: &Event, boundary: DateTime<Utc>) -> SyncResult<bool> {
    match &event.start {
        None => Err(SyncError::MissingField {
            uid: event.log_key().to_string(),
            field: "start",
        }),
        Some(EventTime::Date(date)) => Ok(*date >= boundary.date_naive()),
        Some(EventTime::DateTime { date_time, .. }) => Ok(*date_time >= boundary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn all_day(uid: &str, date: NaiveDate) -> Event {
        Event {
            ical_uid: uid.to_string(),
            start: Some(EventTime::Date(date)),
            ..Default::default()
        }
    }

    fn timed(uid: &str, start: DateTime<Utc>) -> Event {
        Event {
            ical_uid: uid.to_string(),
            start: Some(EventTime::date_time(start)),
            ..Default::default()
        }
    }

    #[test]
    fn all_day_events_compare_dates_only() {
        // A late boundary time on the same day must not push the
        // all-day event into the past.
        let boundary = Utc.with_ymd_and_hms(2018, 2, 15, 23, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 2, 15).unwrap();

        assert!(starts_at_or_after(&all_day("a", date), boundary).unwrap());
        assert!(!starts_at_or_after(&all_day("b", date.pred_opt().unwrap()), boundary).unwrap());
    }

    #[test]
    fn timed_events_compare_instants() {
        let boundary = Utc.with_ymd_and_hms(2018, 2, 15, 23, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2018, 2, 15, 22, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2018, 2, 15, 23, 0, 0).unwrap();

        assert!(!starts_at_or_after(&timed("a", before), boundary).unwrap());
        assert!(starts_at_or_after(&timed("b", after), boundary).unwrap());
    }

    #[test]
    fn split_partitions_both_kinds() {
        let boundary = Utc.with_ymd_and_hms(2020, 6, 10, 12, 0, 0).unwrap();
        let events = vec![
            timed("past", Utc.with_ymd_and_hms(2020, 6, 10, 11, 0, 0).unwrap()),
            timed("pending", Utc.with_ymd_and_hms(2020, 6, 11, 0, 0, 0).unwrap()),
            all_day("today", NaiveDate::from_ymd_opt(2020, 6, 10).unwrap()),
            all_day("yesterday", NaiveDate::from_ymd_opt(2020, 6, 9).unwrap()),
        ];

        let (pending, past) = split_by_start(events, boundary).unwrap();
        let names = |evs: &[Event]| evs.iter().map(|e| e.ical_uid.clone()).collect::<Vec<_>>();
        assert_eq!(names(&pending), vec!["pending", "today"]);
        assert_eq!(names(&past), vec!["past", "yesterday"]);
    }

    #[test]
    fn missing_start_is_an_error() {
        let event = Event {
            ical_uid: "nostart".to_string(),
            ..Default::default()
        };
        let err = starts_at_or_after(&event, Utc::now()).unwrap_err();
        assert!(matches!(err, SyncError::MissingField { field: "start", .. }));
    }
}
