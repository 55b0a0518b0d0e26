//! The envelope every message travels in.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorPayload;
use crate::service;

/// `(service, function)` pair naming a syscall, an event or a response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageType {
    pub service: String,
    pub function: String,
}

impl MessageType {
    pub fn new(service: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            function: function.into(),
        }
    }

    /// Type of a reply envelope. The function part is unused.
    pub fn response() -> Self {
        Self::new(service::RESPONSE, "")
    }

    pub fn is_response(&self) -> bool {
        self.service == service::RESPONSE
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.function)
    }
}

/// A single protocol message.
///
/// ```text
/// { "type": {"service": .., "function": ..}, "data": .., "id": ..?, "error": ..? }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,

    #[serde(default)]
    pub data: Value,

    /// Correlation id; present iff the sender awaits exactly one reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Present only on failure responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl Envelope {
    /// A request that expects exactly one reply tagged with `id`.
    pub fn request(kind: MessageType, data: Value, id: impl Into<String>) -> Self {
        Self {
            kind,
            data,
            id: Some(id.into()),
            error: None,
        }
    }

    /// A fire-and-forget message or event.
    pub fn notify(kind: MessageType, data: Value) -> Self {
        Self {
            kind,
            data,
            id: None,
            error: None,
        }
    }

    /// The reply to request `id`.
    pub fn response(id: impl Into<String>, result: Result<Value, ErrorPayload>) -> Self {
        let (data, error) = match result {
            Ok(data) => (data, None),
            Err(err) => (Value::Null, Some(err)),
        };
        Self {
            kind: MessageType::response(),
            data,
            id: Some(id.into()),
            error,
        }
    }

    pub fn is_response(&self) -> bool {
        self.kind.is_response()
    }

    pub fn expects_response(&self) -> bool {
        !self.is_response() && self.id.is_some()
    }

    /// Split a reply into its outcome.
    pub fn into_result(self) -> Result<Value, ErrorPayload> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let env = Envelope::request(MessageType::new("FS", "read"), json!("/etc"), "a1");
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"type": {"service": "FS", "function": "read"}, "data": "/etc", "id": "a1"})
        );
        assert!(env.expects_response());
    }

    #[test]
    fn test_notify_has_no_id() {
        let env = Envelope::notify(MessageType::new("Std", "out"), json!("hi"));
        let wire = serde_json::to_value(&env).unwrap();
        assert!(wire.get("id").is_none());
        assert!(wire.get("error").is_none());
        assert!(!env.expects_response());
    }

    #[test]
    fn test_response_round_trip() {
        let ok = Envelope::response("a1", Ok(json!(true)));
        assert!(ok.is_response());
        assert!(!ok.expects_response());
        assert_eq!(ok.into_result(), Ok(json!(true)));

        let failed = Envelope::response("a2", Err(ErrorPayload::fs("Not found")));
        let wire = serde_json::to_string(&failed).unwrap();
        let back: Envelope = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.id.as_deref(), Some("a2"));
        assert_eq!(back.into_result(), Err(ErrorPayload::fs("Not found")));
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let env: Envelope =
            serde_json::from_value(json!({"type": {"service": "Process", "function": "end"}}))
                .unwrap();
        assert_eq!(env.data, Value::Null);
        assert_eq!(env.kind.to_string(), "Process.end");
    }
}
