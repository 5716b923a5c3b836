//! REST client for a single Google calendar.

use chrono::{DateTime, SecondsFormat, Utc};
use icsync_core::{BatchAction, Event, FoundEvents, ItemResult, RemoteCalendar, SyncError, SyncResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::batch::{self, BatchBuilder, SubRequest};

/// Production REST root for the Calendar API.
pub const BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// A calendar as returned by the calendarList collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEntry {
    pub id: String,
    #[serde(default)]
    pub summary: String,
}

/// Client bound to one calendar, authenticated with a bearer token.
///
/// Event mutations go through the batch endpoint; listing, existence
/// probes and calendar management use plain REST calls.
pub struct GoogleCalendar {
    http: reqwest::Client,
    access_token: String,
    calendar_id: String,
    base_url: String,
    batch_url: String,
}

impl GoogleCalendar {
    pub fn new(access_token: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self::with_endpoints(access_token, calendar_id, BASE_URL, batch::BATCH_URL)
    }

    /// Like [`new`](Self::new) but with explicit endpoints, so tests can
    /// point the client at a local server.
    pub fn with_endpoints(
        access_token: impl Into<String>,
        calendar_id: impl Into<String>,
        base_url: impl Into<String>,
        batch_url: impl Into<String>,
    ) -> Self {
        GoogleCalendar {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            calendar_id: calendar_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            batch_url: batch_url.into(),
        }
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Path for a batch sub-request. Sub-request paths are relative to
    /// the API host, not to `base_url`, and always use the canonical
    /// `/calendar/v3` prefix.
    fn sub_path(&self, suffix: &str, query: &[(&str, &str)]) -> String {
        let mut path = format!("/calendar/v3/calendars/{}/{suffix}", self.calendar_id);
        if !query.is_empty() {
            path.push('?');
            path.push_str(&encode_query(query));
        }
        path
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    async fn execute_batch(&self, batch: BatchBuilder) -> SyncResult<Vec<Option<batch::SubResponse>>> {
        let expected = batch.len();
        let content_type = batch.content_type();
        let body = batch.into_body();

        let response = self
            .http
            .post(&self.batch_url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        let status = response.status();
        let response_content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        if !status.is_success() {
            return Err(SyncError::Remote(format!(
                "batch call failed with HTTP {}: {}",
                status.as_u16(),
                excerpt(&text)
            )));
        }
        batch::parse_batch_response(&response_content_type, &text, expected)
    }

    /// Sends one batch of same-action sub-requests and matches the parts
    /// back to their events by sequence number.
    async fn dispatch(
        &self,
        action: BatchAction,
        items: Vec<(Event, SubRequest)>,
    ) -> SyncResult<Vec<ItemResult>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut batch = BatchBuilder::new();
        let mut events_by_req = Vec::with_capacity(items.len());
        for (event, request) in items {
            batch.push(request);
            events_by_req.push(event);
        }

        let slots = self.execute_batch(batch).await?;
        let results = events_by_req
            .into_iter()
            .zip(slots)
            .map(|(event, slot)| match slot {
                Some(part) if part.is_success() => {
                    info!(action = action.as_str(), uid = event.log_key(), "event {} ok", action.as_str());
                    ItemResult::ok(event)
                }
                Some(part) => {
                    error!(
                        action = action.as_str(),
                        uid = event.log_key(),
                        status = part.status,
                        "event {} failed", action.as_str()
                    );
                    let reason = SyncError::Remote(format!(
                        "HTTP {}: {}",
                        part.status,
                        excerpt(&part.body)
                    ));
                    ItemResult::failed(event, reason)
                }
                None => {
                    error!(action = action.as_str(), uid = event.log_key(), "no batch response for event");
                    ItemResult::failed(event, SyncError::Remote("no batch response received".into()))
                }
            })
            .collect();
        Ok(results)
    }

    async fn modify(
        &self,
        action: BatchAction,
        pairs: Vec<(Event, Event)>,
    ) -> SyncResult<Vec<ItemResult>> {
        let mut items = Vec::with_capacity(pairs.len());
        for (new, old) in pairs {
            // The destination id comes from the old side; a pair without
            // one was never confirmed to exist remotely.
            let Some(id) = old.id.as_deref() else {
                warn!(uid = new.log_key(), "skipping modify for event without a remote id");
                continue;
            };
            let path = self.sub_path(&format!("events/{id}"), &[("fields", "id")]);
            let body = serde_json::to_value(&new)
                .map_err(|e| SyncError::Serialization(e.to_string()))?;
            let request = match action {
                BatchAction::Patch => SubRequest::patch(path, body),
                _ => SubRequest::put(path, body),
            };
            items.push((new, request));
        }
        self.dispatch(action, items).await
    }
}

#[async_trait::async_trait]
impl RemoteCalendar for GoogleCalendar {
    async fn list_events_from(&self, start: DateTime<Utc>) -> SyncResult<Vec<Event>> {
        let time_min = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(self.events_url())
                .bearer_auth(&self.access_token)
                .query(&[
                    ("singleEvents", "true"),
                    ("timeMin", time_min.as_str()),
                    ("fields", "nextPageToken,items(id,iCalUID,updated)"),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = request
                .send()
                .await
                .map_err(|e| SyncError::Remote(e.to_string()))?;
            let page: EventsPage = read_json(response).await?;
            events.extend(page.items);
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        info!(count = events.len(), "remote events listed");
        Ok(events)
    }

    async fn find_existing(&self, candidates: Vec<Event>) -> SyncResult<FoundEvents> {
        if candidates.is_empty() {
            return Ok(FoundEvents::default());
        }
        let mut batch = BatchBuilder::new();
        let mut events_by_req = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.ical_uid.is_empty() {
                return Err(SyncError::MissingUid);
            }
            let path = self.sub_path(
                "events",
                &[
                    ("iCalUID", candidate.ical_uid.as_str()),
                    ("showDeleted", "true"),
                    ("fields", "items(id,iCalUID,updated)"),
                ],
            );
            batch.push(SubRequest::get(path));
            events_by_req.push(candidate);
        }

        let slots = self.execute_batch(batch).await?;
        let mut found = FoundEvents::default();
        for (candidate, slot) in events_by_req.into_iter().zip(slots) {
            match slot {
                Some(part) if part.is_success() => {
                    match serde_json::from_str::<EventsPage>(&part.body) {
                        Ok(page) => {
                            let mut items = page.items;
                            if items.is_empty() {
                                found.missing.push(candidate);
                            } else {
                                found.exists.push((candidate, items.remove(0)));
                            }
                        }
                        Err(e) => {
                            // A broken lookup must not lose the event, so
                            // it falls through to the insert path.
                            warn!(uid = candidate.log_key(), error = %e, "unreadable lookup response");
                            found.missing.push(candidate);
                        }
                    }
                }
                Some(part) => {
                    error!(uid = candidate.log_key(), status = part.status, "existence lookup failed");
                    found.missing.push(candidate);
                }
                None => {
                    error!(uid = candidate.log_key(), "no batch response for existence lookup");
                    found.missing.push(candidate);
                }
            }
        }
        info!(
            exists = found.exists.len(),
            missing = found.missing.len(),
            "existence probe finished"
        );
        Ok(found)
    }

    async fn insert_events(&self, events: Vec<Event>) -> SyncResult<Vec<ItemResult>> {
        let mut items = Vec::with_capacity(events.len());
        for event in events {
            let path = self.sub_path("events", &[("fields", "id")]);
            let body = serde_json::to_value(&event)
                .map_err(|e| SyncError::Serialization(e.to_string()))?;
            items.push((event, SubRequest::post(path, body)));
        }
        self.dispatch(BatchAction::Insert, items).await
    }

    async fn patch_events(&self, pairs: Vec<(Event, Event)>) -> SyncResult<Vec<ItemResult>> {
        self.modify(BatchAction::Patch, pairs).await
    }

    async fn update_events(&self, pairs: Vec<(Event, Event)>) -> SyncResult<Vec<ItemResult>> {
        self.modify(BatchAction::Update, pairs).await
    }

    async fn delete_events(&self, events: Vec<Event>) -> SyncResult<Vec<ItemResult>> {
        let mut results = Vec::new();
        let mut items = Vec::with_capacity(events.len());
        for event in events {
            match event.id.clone() {
                Some(id) => {
                    let path = self.sub_path(&format!("events/{id}"), &[]);
                    items.push((event, SubRequest::delete(path)));
                }
                None => {
                    error!(uid = event.log_key(), "cannot delete event without a remote id");
                    results.push(ItemResult::failed(
                        event,
                        SyncError::Remote("event has no remote id".into()),
                    ));
                }
            }
        }
        let mut dispatched = self.dispatch(BatchAction::Delete, items).await?;
        results.append(&mut dispatched);
        Ok(results)
    }
}

/// Calendar-level management, outside the sync loop.
impl GoogleCalendar {
    pub async fn list_calendars(&self) -> SyncResult<Vec<CalendarEntry>> {
        let response = self
            .http
            .get(format!("{}/users/me/calendarList", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "items(id,summary)")])
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        let list: CalendarList = read_json(response).await?;
        Ok(list.items)
    }

    /// Creates a new calendar and rebinds the client to it.
    pub async fn create(&mut self, summary: &str, time_zone: Option<&str>) -> SyncResult<String> {
        let mut body = serde_json::json!({ "summary": summary });
        if let Some(tz) = time_zone {
            body["timeZone"] = tz.into();
        }
        let response = self
            .http
            .post(format!("{}/calendars", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        let created: CreatedCalendar = read_json(response).await?;
        info!(id = %created.id, summary, "calendar created");
        self.calendar_id = created.id.clone();
        Ok(created.id)
    }

    pub async fn rename(&self, summary: &str) -> SyncResult<()> {
        let response = self
            .http
            .patch(format!("{}/calendars/{}", self.base_url, self.calendar_id))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "summary": summary }))
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        expect_success(response).await
    }

    pub async fn delete_calendar(&self) -> SyncResult<()> {
        let response = self
            .http
            .delete(format!("{}/calendars/{}", self.base_url, self.calendar_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        expect_success(response).await
    }

    /// Grants read access to everyone.
    pub async fn make_public(&self) -> SyncResult<()> {
        self.insert_acl(serde_json::json!({
            "scope": { "type": "default" },
            "role": "reader",
        }))
        .await
    }

    pub async fn add_owner(&self, email: &str) -> SyncResult<()> {
        self.insert_acl(serde_json::json!({
            "scope": { "type": "user", "value": email },
            "role": "owner",
        }))
        .await
    }

    async fn insert_acl(&self, rule: serde_json::Value) -> SyncResult<()> {
        let response = self
            .http
            .post(format!("{}/calendars/{}/acl", self.base_url, self.calendar_id))
            .bearer_auth(&self.access_token)
            .json(&rule)
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        expect_success(response).await
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<Event>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarList {
    #[serde(default)]
    items: Vec<CalendarEntry>,
}

#[derive(Debug, Deserialize)]
struct CreatedCalendar {
    id: String,
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> SyncResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SyncError::Remote(e.to_string()))?;
    if !status.is_success() {
        return Err(SyncError::Remote(format!(
            "HTTP {}: {}",
            status.as_u16(),
            excerpt(&text)
        )));
    }
    serde_json::from_str(&text).map_err(|e| SyncError::Serialization(e.to_string()))
}

async fn expect_success(response: reqwest::Response) -> SyncResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    Err(SyncError::Remote(format!(
        "HTTP {}: {}",
        status.as_u16(),
        excerpt(&text)
    )))
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn excerpt(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(200)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..end].trim_end()
}
