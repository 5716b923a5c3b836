//! iCalendar document parsing into canonical events.
//!
//! Uses the `icalendar` crate's raw parser. Every VEVENT must carry a
//! UID and a DTSTART, and an end must be derivable from DTEND or
//! DTSTART+DURATION; anything less is rejected here, before any
//! reconciliation runs. Date values stay calendar dates, date-times
//! are normalized to UTC.

use chrono::{DateTime, Days, TimeZone, Utc};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, read_calendar, unfold},
};
use tracing::info;

use crate::error::{SyncError, SyncResult};
use crate::event::{Event, EventTime};

/// Parse an `.ics` document into the canonical event list.
pub fn events_from_ics(content: &str) -> SyncResult<Vec<Event>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| SyncError::IcsParse(e.to_string()))?;

    let mut events = Vec::new();
    for component in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        events.push(event_from_vevent(component)?);
    }

    info!(count = events.len(), "events converted from ics");
    Ok(events)
}

fn event_from_vevent(vevent: &Component) -> SyncResult<Event> {
    let uid = vevent
        .find_prop("UID")
        .ok_or_else(|| SyncError::IcsParse("VEVENT without UID".into()))?
        .val
        .to_string();

    let start_prop = vevent.find_prop("DTSTART").ok_or_else(|| {
        SyncError::IcsParse(format!("event '{uid}' has no DTSTART"))
    })?;
    let start = to_event_time(
        DatePerhapsTime::try_from(start_prop)
            .map_err(|e| SyncError::IcsParse(format!("bad DTSTART in '{uid}': {e}")))?,
    )?;

    let end = if let Some(prop) = vevent.find_prop("DTEND") {
        to_event_time(
            DatePerhapsTime::try_from(prop)
                .map_err(|e| SyncError::IcsParse(format!("bad DTEND in '{uid}': {e}")))?,
        )?
    } else if let Some(prop) = vevent.find_prop("DURATION") {
        end_from_duration(&start, prop.val.as_ref(), &uid)?
    } else {
        return Err(SyncError::IcsParse(format!(
            "event '{uid}' has no DTEND or DURATION"
        )));
    };

    let string_prop = |name: &str| vevent.find_prop(name).map(|p| p.val.to_string());

    Ok(Event {
        ical_uid: uid.clone(),
        start: Some(start),
        end: Some(end),
        created: instant_prop(vevent, "CREATED", &uid)?,
        updated: instant_prop(vevent, "LAST-MODIFIED", &uid)?,
        summary: string_prop("SUMMARY"),
        description: string_prop("DESCRIPTION"),
        location: string_prop("LOCATION"),
        transparency: string_prop("TRANSP").map(|v| v.to_lowercase()),
        ..Default::default()
    })
}

fn to_event_time(value: DatePerhapsTime) -> SyncResult<EventTime> {
    match value {
        DatePerhapsTime::Date(date) => Ok(EventTime::Date(date)),
        DatePerhapsTime::DateTime(dt) => Ok(EventTime::date_time(to_utc(dt)?)),
    }
}

fn to_utc(value: CalendarDateTime) -> SyncResult<DateTime<Utc>> {
    match value {
        CalendarDateTime::Utc(dt) => Ok(dt),
        // Floating local times carry no zone; treat them as UTC.
        CalendarDateTime::Floating(naive) => Ok(naive.and_utc()),
        CalendarDateTime::WithTimezone { date_time, tzid } => {
            let tz: chrono_tz::Tz = tzid
                .parse()
                .map_err(|_| SyncError::IcsParse(format!("unknown timezone '{tzid}'")))?;
            tz.from_local_datetime(&date_time)
                .single()
                .ok_or_else(|| {
                    SyncError::IcsParse(format!("ambiguous local time {date_time} in {tzid}"))
                })
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

/// CREATED / LAST-MODIFIED style properties: always an instant; a bare
/// date is read as midnight UTC.
fn instant_prop(
    vevent: &Component,
    name: &str,
    uid: &str,
) -> SyncResult<Option<DateTime<Utc>>> {
    let Some(prop) = vevent.find_prop(name) else {
        return Ok(None);
    };
    let value = DatePerhapsTime::try_from(prop)
        .map_err(|e| SyncError::IcsParse(format!("bad {name} in '{uid}': {e}")))?;
    let instant = match value {
        DatePerhapsTime::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        DatePerhapsTime::DateTime(dt) => to_utc(dt)?,
    };
    Ok(Some(instant))
}

/// Derive the end from DTSTART+DURATION. An all-day start keeps its
/// all-day shape: only whole days of the duration move the date.
fn end_from_duration(start: &EventTime, value: &str, uid: &str) -> SyncResult<EventTime> {
    let duration = iso8601::duration(value)
        .map_err(|e| SyncError::IcsParse(format!("bad DURATION in '{uid}': {e}")))?;
    let std_duration: std::time::Duration = duration.into();

    match start {
        EventTime::Date(date) => date
            .checked_add_days(Days::new(std_duration.as_secs() / 86_400))
            .map(EventTime::Date)
            .ok_or_else(|| SyncError::IcsParse(format!("DURATION out of range in '{uid}'"))),
        EventTime::DateTime { date_time, .. } => {
            let span = chrono::Duration::from_std(std_duration)
                .map_err(|_| SyncError::IcsParse(format!("DURATION out of range in '{uid}'")))?;
            Ok(EventTime::date_time(*date_time + span))
        }
    }
}
