//! Multipart/mixed encoding for the Calendar batch endpoint.
//!
//! A batch request wraps several HTTP sub-requests into one body, each
//! tagged with a `Content-ID` of the form `<item:N>`. The service answers
//! with another multipart body whose parts carry `<response-item:N>` ids,
//! possibly out of order, so responses are matched back to their requests
//! by the sequence number alone.

use icsync_core::{SyncError, SyncResult};
use tracing::warn;
use uuid::Uuid;

/// Production batch endpoint for the Calendar API.
pub const BATCH_URL: &str = "https://www.googleapis.com/batch/calendar/v3";

/// A single HTTP call inside a batch body.
#[derive(Debug, Clone)]
pub struct SubRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl SubRequest {
    pub fn get(path: String) -> Self {
        SubRequest { method: "GET", path, body: None }
    }

    pub fn post(path: String, body: serde_json::Value) -> Self {
        SubRequest { method: "POST", path, body: Some(body) }
    }

    pub fn patch(path: String, body: serde_json::Value) -> Self {
        SubRequest { method: "PATCH", path, body: Some(body) }
    }

    pub fn put(path: String, body: serde_json::Value) -> Self {
        SubRequest { method: "PUT", path, body: Some(body) }
    }

    pub fn delete(path: String) -> Self {
        SubRequest { method: "DELETE", path, body: None }
    }
}

/// Accumulates sub-requests and renders the multipart body.
///
/// Sequence numbers are assigned in push order, starting at zero and
/// without gaps, so the caller can keep a side table indexed the same way.
#[derive(Debug)]
pub struct BatchBuilder {
    boundary: String,
    requests: Vec<SubRequest>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        BatchBuilder {
            boundary: format!("batch_{}", Uuid::new_v4().simple()),
            requests: Vec::new(),
        }
    }

    /// Appends a sub-request and returns its sequence number.
    pub fn push(&mut self, request: SubRequest) -> usize {
        let seq = self.requests.len();
        self.requests.push(request);
        seq
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Value for the outer `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    /// Renders the request body, consuming the builder.
    pub fn into_body(self) -> String {
        let mut body = String::new();
        for (seq, request) in self.requests.iter().enumerate() {
            body.push_str(&format!("--{}\r\n", self.boundary));
            body.push_str("Content-Type: application/http\r\n");
            body.push_str(&format!("Content-ID: <item:{seq}>\r\n\r\n"));
            body.push_str(&format!("{} {} HTTP/1.1\r\n", request.method, request.path));
            match &request.body {
                Some(json) => {
                    body.push_str("Content-Type: application/json\r\n\r\n");
                    body.push_str(&json.to_string());
                    body.push_str("\r\n");
                }
                None => body.push_str("\r\n"),
            }
        }
        body.push_str(&format!("--{}--\r\n", self.boundary));
        body
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One embedded HTTP response extracted from a batch body.
#[derive(Debug, Clone)]
pub struct SubResponse {
    pub status: u16,
    pub body: String,
}

impl SubResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Splits a batch response body into per-request slots.
///
/// `expected` is the number of sub-requests that were sent. The returned
/// vector has one slot per sequence number; a slot stays `None` when the
/// body carried no part for it, which the caller treats as a failure of
/// that item only.
pub fn parse_batch_response(
    content_type: &str,
    body: &str,
    expected: usize,
) -> SyncResult<Vec<Option<SubResponse>>> {
    let boundary = boundary_param(content_type).ok_or_else(|| {
        SyncError::Remote(format!("batch response without a multipart boundary: {content_type}"))
    })?;

    let mut slots: Vec<Option<SubResponse>> = (0..expected).map(|_| None).collect();
    let delimiter = format!("--{boundary}");
    for raw in body.split(delimiter.as_str()) {
        let part = raw.trim_start_matches("\r\n").trim_start_matches('\n');
        // The preamble before the first delimiter and the closing "--"
        // after the last one are not parts.
        if part.starts_with("--") || part.trim().is_empty() {
            continue;
        }
        match parse_part(part) {
            Some((seq, response)) if seq < expected => slots[seq] = Some(response),
            Some((seq, _)) => warn!(seq, expected, "batch response part with out-of-range id"),
            None => warn!("skipping unparseable batch response part"),
        }
    }
    Ok(slots)
}

fn boundary_param(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        key.eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"'))
    })
}

fn parse_part(part: &str) -> Option<(usize, SubResponse)> {
    let (outer_headers, embedded) = split_headers(part)?;
    let seq = content_id_seq(outer_headers)?;

    // The embedded payload is itself an HTTP response: status line,
    // headers, blank line, body.
    let embedded = embedded.trim_start();
    let status_line = embedded.lines().next()?;
    let status: u16 = status_line.split_whitespace().nth(1)?.parse().ok()?;
    let body = match split_headers(embedded) {
        Some((_, rest)) => rest.trim().to_string(),
        None => String::new(),
    };
    Some((seq, SubResponse { status, body }))
}

fn split_headers(text: &str) -> Option<(&str, &str)> {
    text.split_once("\r\n\r\n").or_else(|| text.split_once("\n\n"))
}

/// Pulls the sequence number out of a `Content-ID: <response-item:N>`
/// header. The `response-` prefix the service adds is ignored; only the
/// number after the last colon matters.
fn content_id_seq(headers: &str) -> Option<usize> {
    for line in headers.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-id") {
            let value = value.trim().trim_start_matches('<').trim_end_matches('>');
            return value.rsplit(':').next()?.parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_part(seq: usize, status: u16, reason: &str, body: &str) -> String {
        format!(
            "--batch_abc\r\nContent-Type: application/http\r\nContent-ID: <response-item:{seq}>\r\n\r\nHTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\r\n{body}\r\n"
        )
    }

    #[test]
    fn body_numbers_parts_in_push_order() {
        let mut batch = BatchBuilder::new();
        batch.push(SubRequest::post(
            "/calendar/v3/calendars/c1/events".into(),
            serde_json::json!({"summary": "a"}),
        ));
        batch.push(SubRequest::delete("/calendar/v3/calendars/c1/events/e2".into()));
        assert_eq!(batch.len(), 2);

        let content_type = batch.content_type();
        let body = batch.into_body();
        let boundary = boundary_param(&content_type).unwrap().to_string();

        assert!(body.contains("Content-ID: <item:0>"));
        assert!(body.contains("Content-ID: <item:1>"));
        assert!(body.contains("POST /calendar/v3/calendars/c1/events HTTP/1.1"));
        assert!(body.contains("DELETE /calendar/v3/calendars/c1/events/e2 HTTP/1.1"));
        assert!(
            body.find("<item:0>").unwrap() < body.find("<item:1>").unwrap(),
            "parts must appear in push order"
        );
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn requests_without_payload_have_no_json_header() {
        let mut batch = BatchBuilder::new();
        batch.push(SubRequest::delete("/calendar/v3/calendars/c1/events/e1".into()));
        let body = batch.into_body();
        assert!(!body.contains("application/json"));
    }

    #[test]
    fn parses_out_of_order_parts_back_into_slots() {
        let body = format!(
            "{}{}{}--batch_abc--\r\n",
            response_part(2, 200, "OK", r#"{"id": "g3"}"#),
            response_part(0, 200, "OK", r#"{"id": "g1"}"#),
            response_part(1, 410, "Gone", r#"{"error": {"code": 410}}"#),
        );
        let slots =
            parse_batch_response("multipart/mixed; boundary=batch_abc", &body, 3).unwrap();

        assert_eq!(slots.len(), 3);
        let first = slots[0].as_ref().unwrap();
        assert!(first.is_success());
        assert_eq!(first.body, r#"{"id": "g1"}"#);
        let second = slots[1].as_ref().unwrap();
        assert_eq!(second.status, 410);
        assert!(!second.is_success());
        assert!(slots[2].as_ref().unwrap().is_success());
    }

    #[test]
    fn missing_part_leaves_slot_empty() {
        let body = format!("{}--batch_abc--\r\n", response_part(0, 200, "OK", "{}"));
        let slots =
            parse_batch_response("multipart/mixed; boundary=batch_abc", &body, 2).unwrap();
        assert!(slots[0].is_some());
        assert!(slots[1].is_none());
    }

    #[test]
    fn quoted_boundary_is_accepted() {
        let body = format!("{}--batch_abc--\r\n", response_part(0, 204, "No Content", ""));
        let slots =
            parse_batch_response("multipart/mixed; boundary=\"batch_abc\"", &body, 1).unwrap();
        assert_eq!(slots[0].as_ref().unwrap().status, 204);
    }

    #[test]
    fn response_without_boundary_is_an_error() {
        let err = parse_batch_response("text/html", "nope", 1).unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
    }
}
