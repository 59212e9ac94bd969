//! Decoded response bodies.
//!
//! sFlow-RT answers most endpoints with JSON, but `/version` and the
//! Prometheus exposition endpoint return plain text, and error pages are
//! often text too. The client does not know ahead of time which one it will
//! get, so the decision is made once per body: a successful `serde_json`
//! parse gives `Json`, anything else is kept verbatim as `Text`.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::http::HttpResponse;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Decode a body, falling back to the raw text when it is not JSON.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => Payload::Json(value),
            Err(err) => {
                tracing::trace!(error = %err, len = body.len(), "body is not JSON, keeping text");
                Payload::Text(body.to_string())
            }
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Payload::Json(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Payload::Text(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    /// Text form of the payload. JSON values are serialized compactly.
    pub fn into_text(self) -> String {
        match self {
            Payload::Json(value) => value.to_string(),
            Payload::Text(text) => text,
        }
    }
}

impl From<HttpResponse> for Payload {
    fn from(response: HttpResponse) -> Self {
        Payload::from_body(&response.body)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(value) => write!(f, "{value}"),
            Payload::Text(text) => f.write_str(text),
        }
    }
}
