//! Request/response values exchanged by chains and transports

use crate::errors::{ErrorContext, Result};
use serde::{Deserialize, Serialize};

/// Strongly typed message ID to prevent confusion with other string types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Fresh random identifier
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Extract the `id` field of a JSON text frame
    pub fn extract(frame: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(frame)?;
        json["id"]
            .as_str()
            .map(|s| Self(s.to_string()))
            .with_message_context("Missing or invalid 'id' field in frame")
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One request issued by a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub id: MessageId,
    pub payload: String,
}

impl Request {
    /// JSON text frame carrying the id, for transports that correlate by echo
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Produces the requests a chain issues; every request gets a fresh id
#[derive(Debug, Clone, Default)]
pub struct RequestTemplate {
    payload: String,
}

impl RequestTemplate {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn next(&self) -> Request {
        Request {
            id: MessageId::random(),
            payload: self.payload.clone(),
        }
    }
}

/// Response as seen by a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx class
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.body.is_empty() {
            write!(f, "status {}", self.status)
        } else if self.body.len() > 64 {
            let cut = (0..=64)
                .rev()
                .find(|i| self.body.is_char_boundary(*i))
                .unwrap_or(0);
            write!(f, "status {} ({}...)", self.status, &self.body[..cut])
        } else {
            write!(f, "status {} ({})", self.status, self.body)
        }
    }
}

/// Final resolution of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Response(Response),
    /// Retransmissions exhausted, connection lost, or the transport was stopped
    NoResponse,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Response(response) if response.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_id() {
        let id = MessageId::extract(r#"{"id": "abc", "payload": ""}"#).unwrap();
        assert_eq!(id.as_ref(), "abc");
        assert!(MessageId::extract(r#"{"payload": "x"}"#).is_err());
        assert!(MessageId::extract("not json").is_err());
    }

    #[test]
    fn test_frame_carries_id() {
        let request = RequestTemplate::new("ping").next();
        let frame = request.to_frame().unwrap();
        assert_eq!(MessageId::extract(&frame).unwrap(), request.id);
        assert!(frame.contains(r#""payload":"ping""#));
    }

    #[test]
    fn test_template_fresh_ids() {
        let template = RequestTemplate::new("");
        assert_ne!(template.next().id, template.next().id);
    }

    #[test]
    fn test_outcome_success() {
        assert!(Outcome::Response(Response::new(204, "")).is_success());
        assert!(!Outcome::Response(Response::new(501, "not implemented")).is_success());
        assert!(!Outcome::NoResponse.is_success());
    }
}
