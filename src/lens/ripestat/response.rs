//! Classification of raw RIPEstat responses.
//!
//! Every RIPEstat data call answers with the same envelope:
//!
//! ```json
//! {
//!   "status": "ok",
//!   "data": { ... },
//!   "data_call_name": "announced-prefixes",
//!   "data_call_status": "supported - connect to stat.ripe.net for more info",
//!   "version": "1.2",
//!   "messages": [["info", "..."]]
//! }
//! ```
//!
//! [`parse_response`] turns the transport result into a [`CallOutcome`].

use crate::lens::ripestat::status::StatusTag;
use crate::lens::ripestat::transport::{HttpResponse, TransportFailure};
use crate::lens::utils::scalar_to_string;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Reason used when the body is not valid JSON
pub const REASON_JSON_DECODE: &str = "json_decode";
/// Reason used when the envelope has no `data` object
pub const REASON_NO_DATA: &str = "nodata";
/// Reason used when the envelope has no `status` string
pub const REASON_NO_STATUS: &str = "nostatus";
/// Reason used when RIPEstat answers for a data call that does not exist
pub const REASON_UNKNOWN_ENDPOINT: &str = "unknown API endpoint";

/// Metadata about a completed data call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallMeta {
    pub url: String,
    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_call_name: Option<String>,
    /// Declared call status (ok/error/maintenance)
    pub status: StatusTag,
    /// Declared data call maturity (supported/deprecated/development/unknown)
    pub maturity: StatusTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Messages keyed by severity
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<StatusTag, String>,
}

impl CallMeta {
    /// Metadata for a call whose body could not be interpreted
    pub fn minimal(url: &str, http_status: u16) -> Self {
        Self {
            url: url.to_string(),
            http_status,
            data_call_name: None,
            status: StatusTag::Unknown,
            maturity: StatusTag::Unknown,
            version: None,
            messages: BTreeMap::new(),
        }
    }

    pub fn message(&self, severity: &StatusTag) -> Option<&str> {
        self.messages.get(severity).map(String::as_str)
    }

    /// The informational message, if any
    pub fn info(&self) -> Option<&str> {
        self.message(&StatusTag::Info)
    }
}

/// Classified result of a single data call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Success { data: Value, call: CallMeta },
    ApplicationError { reason: String, call: CallMeta },
    /// No response was obtained
    TransportError { reason: String, url: String },
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    pub fn call(&self) -> Option<&CallMeta> {
        match self {
            CallOutcome::Success { call, .. } | CallOutcome::ApplicationError { call, .. } => {
                Some(call)
            }
            CallOutcome::TransportError { .. } => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            CallOutcome::Success { call, .. } | CallOutcome::ApplicationError { call, .. } => {
                call.url.as_str()
            }
            CallOutcome::TransportError { url, .. } => url.as_str(),
        }
    }

    /// Error reason, `None` on success
    pub fn error_reason(&self) -> Option<&str> {
        match self {
            CallOutcome::Success { .. } => None,
            CallOutcome::ApplicationError { reason, .. }
            | CallOutcome::TransportError { reason, .. } => Some(reason.as_str()),
        }
    }
}

/// Classify a transport result for the request sent to `url`
pub fn parse_response(
    url: &str,
    response: Result<HttpResponse, TransportFailure>,
) -> CallOutcome {
    match response {
        Ok(response) => parse_body(url, response.status, &response.body),
        Err(failure) => CallOutcome::TransportError {
            reason: failure.to_string(),
            url: url.to_string(),
        },
    }
}

/// Classify a response body, regardless of its HTTP status code
pub fn parse_body(url: &str, http_status: u16, body: &[u8]) -> CallOutcome {
    let mut call = CallMeta::minimal(url, http_status);

    let root: Map<String, Value> = match serde_json::from_slice(body) {
        Ok(Value::Object(root)) => root,
        // valid JSON without an envelope has no data either
        Ok(_) => return application_error(REASON_NO_DATA, call),
        Err(e) => {
            debug!("failed to decode response from {}: {}", url, e);
            return application_error(REASON_JSON_DECODE, call);
        }
    };

    call.data_call_name = root
        .get("data_call_name")
        .and_then(Value::as_str)
        .map(str::to_string);
    call.maturity = root
        .get("data_call_status")
        .and_then(Value::as_str)
        .map(StatusTag::normalize)
        .unwrap_or_default();
    call.version = root.get("version").and_then(scalar_to_string);
    call.messages = decode_messages(root.get("messages"));

    let data = match root.get("data") {
        Some(Value::Object(data)) => data,
        _ => return application_error(REASON_NO_DATA, call),
    };

    call.status = match root.get("status").and_then(Value::as_str) {
        Some(status) => StatusTag::normalize(status),
        None => return application_error(REASON_NO_STATUS, call),
    };

    if call.status == StatusTag::Error {
        let reason = call
            .message(&StatusTag::Error)
            .unwrap_or("error")
            .to_string();
        return CallOutcome::ApplicationError { reason, call };
    }

    // RIPEstat answers unknown data calls with status ok, empty data and a message
    if data.is_empty() && call.messages.values().any(|m| is_unknown_call_message(m)) {
        call.maturity = StatusTag::Unknown;
        call.status = StatusTag::Error;
        return application_error(REASON_UNKNOWN_ENDPOINT, call);
    }

    CallOutcome::Success {
        data: Value::Object(data.clone()),
        call,
    }
}

fn application_error(reason: &str, call: CallMeta) -> CallOutcome {
    CallOutcome::ApplicationError {
        reason: reason.to_string(),
        call,
    }
}

/// Decode `[[severity, text], ...]` into a map keyed by severity.
///
/// Malformed entries are skipped; repeated severities are joined by newline.
fn decode_messages(messages: Option<&Value>) -> BTreeMap<StatusTag, String> {
    let mut decoded: BTreeMap<StatusTag, String> = BTreeMap::new();
    let Some(Value::Array(entries)) = messages else {
        return decoded;
    };

    for entry in entries {
        let (severity, text) = match entry.as_array().map(Vec::as_slice) {
            Some([Value::String(severity), Value::String(text), ..]) => (severity, text),
            _ => continue,
        };
        decoded
            .entry(StatusTag::normalize(severity))
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(text);
            })
            .or_insert_with(|| text.clone());
    }
    decoded
}

fn is_unknown_call_message(message: &str) -> bool {
    static UNKNOWN_CALL: OnceLock<Option<Regex>> = OnceLock::new();
    UNKNOWN_CALL
        .get_or_init(|| Regex::new(r"(?i)data\s+call\s+does\s+not\s+exist").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "https://stat.ripe.net/data/whois/data.json?resource=3333";

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_success() {
        let raw = body(json!({
            "status": "ok",
            "data": {"prefixes": [{"prefix": "193.0.0.0/21"}]},
            "data_call_name": "announced-prefixes",
            "data_call_status": "supported - connect to stat.ripe.net for more info",
            "version": "1.2",
            "messages": [["info", "Results exclude routes with very low visibility."]]
        }));

        match parse_body(URL, 200, &raw) {
            CallOutcome::Success { data, call } => {
                assert_eq!(data["prefixes"][0]["prefix"], "193.0.0.0/21");
                assert_eq!(call.status, StatusTag::Ok);
                assert_eq!(call.maturity, StatusTag::Supported);
                assert_eq!(call.version.as_deref(), Some("1.2"));
                assert_eq!(call.data_call_name.as_deref(), Some("announced-prefixes"));
                assert_eq!(
                    call.info(),
                    Some("Results exclude routes with very low visibility.")
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_endpoint_reclassified() {
        let raw = body(json!({
            "status": "ok",
            "data": {},
            "data_call_status": "supported",
            "messages": [["info", "The  Data Call\tDOES not   exist: please check the name"]]
        }));

        match parse_body(URL, 200, &raw) {
            CallOutcome::ApplicationError { reason, call } => {
                assert_eq!(reason, REASON_UNKNOWN_ENDPOINT);
                assert_eq!(call.status, StatusTag::Error);
                assert_eq!(call.maturity, StatusTag::Unknown);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_empty_data_without_message_is_success() {
        let raw = body(json!({"status": "ok", "data": {}, "messages": []}));
        assert!(parse_body(URL, 200, &raw).is_success());
    }

    #[test]
    fn test_json_decode_regardless_of_status_code() {
        for code in [200, 404, 500] {
            let outcome = parse_body(URL, code, b"<html>Bad Gateway</html>");
            match outcome {
                CallOutcome::ApplicationError { reason, call } => {
                    assert_eq!(reason, REASON_JSON_DECODE);
                    assert_eq!(call.http_status, code);
                    assert_eq!(call.url, URL);
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
    }

    #[test]
    fn test_valid_json_without_envelope() {
        for raw in [&b"42"[..], b"[1,2]", b"\"ok\"", b"null"] {
            assert_eq!(
                parse_body(URL, 200, raw).error_reason(),
                Some(REASON_NO_DATA),
                "body {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_missing_data_and_status() {
        let raw = body(json!({"status": "ok"}));
        assert_eq!(parse_body(URL, 200, &raw).error_reason(), Some(REASON_NO_DATA));

        let raw = body(json!({"status": "ok", "data": []}));
        assert_eq!(parse_body(URL, 200, &raw).error_reason(), Some(REASON_NO_DATA));

        let raw = body(json!({"data": {"a": 1}}));
        assert_eq!(
            parse_body(URL, 200, &raw).error_reason(),
            Some(REASON_NO_STATUS)
        );
    }

    #[test]
    fn test_status_error_uses_error_message() {
        let raw = body(json!({
            "status": "error",
            "status_code": 400,
            "data": {},
            "messages": [["error", "Invalid resource 'foo'"]]
        }));
        assert_eq!(
            parse_body(URL, 400, &raw).error_reason(),
            Some("Invalid resource 'foo'")
        );

        let raw = body(json!({"status": "error", "data": {}}));
        assert_eq!(parse_body(URL, 500, &raw).error_reason(), Some("error"));
    }

    #[test]
    fn test_maintenance_and_unknown_status_are_success() {
        let raw = body(json!({"status": "maintenance", "data": {"x": 1}}));
        match parse_body(URL, 200, &raw) {
            CallOutcome::Success { call, .. } => {
                assert_eq!(call.status, StatusTag::Maintenance)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let raw = body(json!({"status": "Degraded service", "data": {"x": 1}}));
        match parse_body(URL, 200, &raw) {
            CallOutcome::Success { call, .. } => {
                assert_eq!(call.status, StatusTag::Other("degraded".to_string()))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_messages_tolerated() {
        let raw = body(json!({
            "status": "ok",
            "data": {"x": 1},
            "messages": [["info"], "warning", [1, 2], ["warning", "first"], ["WARNING", "second"]]
        }));
        let outcome = parse_body(URL, 200, &raw);
        let call = outcome.call().unwrap();
        assert_eq!(call.message(&StatusTag::Warning), Some("first\nsecond"));
        assert_eq!(call.messages.len(), 1);

        let raw = body(json!({"status": "ok", "data": {"x": 1}, "messages": {"info": "x"}}));
        assert!(parse_body(URL, 200, &raw).call().unwrap().messages.is_empty());
    }

    #[test]
    fn test_transport_failure() {
        let outcome = parse_response(
            URL,
            Err(TransportFailure {
                reason: "timeout".to_string(),
                attempts: 3,
            }),
        );
        match &outcome {
            CallOutcome::TransportError { reason, url } => {
                assert!(reason.contains("timeout"));
                assert_eq!(url, URL);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(outcome.call().is_none());
        assert_eq!(outcome.url(), URL);
    }
}
