//! Canonical event types.
//!
//! Events are carried in the remote-API shape (Google Calendar
//! `events#resource`): the converter produces them, the reconciliation
//! logic compares them, and the client serializes them as request
//! bodies without a further mapping step. Fields the sync logic does
//! not model are preserved in a flattened pass-through map.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event in canonical (wire) form.
///
/// `ical_uid` is the stable cross-system identity and the only field
/// the reconciler inspects; `id` is assigned by the remote store and
/// absent until an event exists there. Missing `created`/`updated`
/// means "unknown", not epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "iCalUID", default, skip_serializing_if = "String::is_empty")]
    pub ical_uid: String,

    /// Remote-assigned record id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    // Display fields, carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,

    /// Unrecognized attributes, preserved for round-tripping.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Best identifying key for log lines: the iCalUID when present,
    /// otherwise the remote id.
    pub fn log_key(&self) -> &str {
        if !self.ical_uid.is_empty() {
            &self.ical_uid
        } else {
            self.id.as_deref().unwrap_or("<unknown>")
        }
    }
}

/// Start or end of an event: an all-day date, or an instant.
///
/// Instants are normalized to UTC; the original timezone label is kept
/// when the wire value carried one. Serializes as the Google
/// `{"date": ...}` / `{"dateTime": ..., "timeZone": ...}` shape, and
/// exactly one of the two is present by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventTimeRepr", into = "EventTimeRepr")]
pub enum EventTime {
    Date(NaiveDate),
    DateTime {
        date_time: DateTime<Utc>,
        time_zone: Option<String>,
    },
}

impl EventTime {
    pub fn date_time(value: DateTime<Utc>) -> Self {
        EventTime::DateTime {
            date_time: value,
            time_zone: None,
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }
}

/// Wire shape of [`EventTime`]; both keys optional so the invariant
/// can be checked on deserialize.
#[derive(Serialize, Deserialize)]
struct EventTimeRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    date_time: Option<DateTime<Utc>>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl TryFrom<EventTimeRepr> for EventTime {
    type Error = String;

    fn try_from(repr: EventTimeRepr) -> Result<Self, Self::Error> {
        match (repr.date, repr.date_time) {
            (Some(date), None) => Ok(EventTime::Date(date)),
            (None, Some(date_time)) => Ok(EventTime::DateTime {
                date_time,
                time_zone: repr.time_zone,
            }),
            (Some(_), Some(_)) => Err("event time has both 'date' and 'dateTime'".into()),
            (None, None) => Err("event time has neither 'date' nor 'dateTime'".into()),
        }
    }
}

impl From<EventTime> for EventTimeRepr {
    fn from(value: EventTime) -> Self {
        match value {
            EventTime::Date(date) => EventTimeRepr {
                date: Some(date),
                date_time: None,
                time_zone: None,
            },
            EventTime::DateTime {
                date_time,
                time_zone,
            } => EventTimeRepr {
                date: None,
                date_time: Some(date_time),
                time_zone,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deserializes_listing_item() {
        let json = r#"{
            "id": "abc123",
            "iCalUID": "deadbeef@example.com",
            "updated": "2018-02-15T10:00:00.123Z"
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.ical_uid, "deadbeef@example.com");
        assert_eq!(event.id.as_deref(), Some("abc123"));
        assert!(event.updated.is_some());
        assert!(event.start.is_none());
    }

    #[test]
    fn event_time_wire_shapes() {
        let all_day: EventTime = serde_json::from_str(r#"{"date": "2018-02-15"}"#).unwrap();
        assert_eq!(
            all_day,
            EventTime::Date(NaiveDate::from_ymd_opt(2018, 2, 15).unwrap())
        );

        let timed: EventTime = serde_json::from_str(
            r#"{"dateTime": "2018-02-15T10:00:00+03:00", "timeZone": "Europe/Moscow"}"#,
        )
        .unwrap();
        match timed {
            EventTime::DateTime {
                date_time,
                time_zone,
            } => {
                assert_eq!(date_time, Utc.with_ymd_and_hms(2018, 2, 15, 7, 0, 0).unwrap());
                assert_eq!(time_zone.as_deref(), Some("Europe/Moscow"));
            }
            other => panic!("expected DateTime, got {:?}", other),
        }
    }

    #[test]
    fn event_time_rejects_both_and_neither() {
        let both = r#"{"date": "2018-02-15", "dateTime": "2018-02-15T10:00:00Z"}"#;
        assert!(serde_json::from_str::<EventTime>(both).is_err());

        let neither = r#"{"timeZone": "UTC"}"#;
        assert!(serde_json::from_str::<EventTime>(neither).is_err());
    }

    #[test]
    fn serializes_date_without_datetime_key() {
        let value = serde_json::to_value(EventTime::Date(
            NaiveDate::from_ymd_opt(2018, 2, 15).unwrap(),
        ))
        .unwrap();
        assert_eq!(value, serde_json::json!({"date": "2018-02-15"}));
    }

    #[test]
    fn unknown_fields_round_trip() {
        let json = r#"{
            "iCalUID": "x@test",
            "start": {"dateTime": "2018-02-15T10:00:00Z"},
            "colorId": "7"
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.extra.get("colorId").and_then(|v| v.as_str()), Some("7"));

        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out.get("colorId").and_then(|v| v.as_str()), Some("7"));
        assert_eq!(out.get("iCalUID").and_then(|v| v.as_str()), Some("x@test"));
    }
}
