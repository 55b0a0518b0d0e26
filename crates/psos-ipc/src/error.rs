//! Structured error payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path missing or of the wrong type.
pub const ACCESS_ERROR: &str = "Access Error";
/// Authorization denied.
pub const PERMISSIONS_ERROR: &str = "Permissions Error";
/// Malformed arguments, executable not found.
pub const FS_ERROR: &str = "FS Error";
/// Spawn failure, unknown syscall, missing identity.
pub const PROCESS_ERROR: &str = "Process Error";

/// Detail used by [`FS_ERROR`] payloads for a failed executable lookup.
pub const NOT_FOUND_DETAIL: &str = "Not found";

/// Error carried in the `error` field of a failure response.
///
/// Serialized as a plain list of strings: `[category, detail, ...context]`.
/// Consumers match on [`category`](Self::category), never on the detail text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorPayload(Vec<String>);

impl ErrorPayload {
    pub fn new(category: &str, detail: impl Into<String>) -> Self {
        Self(vec![category.to_string(), detail.into()])
    }

    pub fn access(detail: impl Into<String>) -> Self {
        Self::new(ACCESS_ERROR, detail)
    }

    pub fn permissions(detail: impl Into<String>) -> Self {
        Self::new(PERMISSIONS_ERROR, detail)
    }

    pub fn fs(detail: impl Into<String>) -> Self {
        Self::new(FS_ERROR, detail)
    }

    pub fn process(detail: impl Into<String>) -> Self {
        Self::new(PROCESS_ERROR, detail)
    }

    /// Append a context element.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.0.push(context.into());
        self
    }

    /// Interpret an arbitrary JSON value as an error payload.
    ///
    /// A list of strings is taken as-is; anything else is wrapped as a
    /// process error so crash reports from clients still have a category.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) if items.iter().all(Value::is_string) => Self(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::String(s) => Self::process(s),
            other => Self::process(other.to_string()),
        }
    }

    pub fn category(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn detail(&self) -> &str {
        self.0.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn context(&self) -> &[String] {
        self.0.get(2..).unwrap_or_default()
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn into_parts(self) -> Vec<String> {
        self.0
    }

    /// True for a missing path or a failed executable lookup.
    pub fn is_not_found(&self) -> bool {
        match self.category() {
            ACCESS_ERROR => true,
            FS_ERROR => self.detail() == NOT_FOUND_DETAIL,
            _ => false,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.category() == PERMISSIONS_ERROR
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" : "))
    }
}

impl std::error::Error for ErrorPayload {}

/// Failure to turn an envelope into a [`Syscall`](crate::Syscall).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// No such `(service, function)` pair
    #[error("Attempt to access non-existent System Call {service}.{function}")]
    UnknownSyscall { service: String, function: String },

    /// Pair is known but the payload does not match its shape
    #[error("Invalid payload for {service}.{function}: {reason}")]
    InvalidPayload {
        service: String,
        function: String,
        reason: String,
    },
}

impl DecodeError {
    pub fn is_unknown_syscall(&self) -> bool {
        matches!(self, Self::UnknownSyscall { .. })
    }
}

impl From<DecodeError> for ErrorPayload {
    fn from(err: DecodeError) -> Self {
        match &err {
            DecodeError::UnknownSyscall { .. } => ErrorPayload::process(err.to_string()),
            DecodeError::InvalidPayload { service, .. } if service == crate::service::FS => {
                ErrorPayload::fs(err.to_string())
            }
            DecodeError::InvalidPayload { .. } => ErrorPayload::process(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serializes_as_list() {
        let err = ErrorPayload::access("Cannot access '/x': No such file").with_context("/x");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!(["Access Error", "Cannot access '/x': No such file", "/x"])
        );
        assert_eq!(err.category(), ACCESS_ERROR);
        assert_eq!(err.context(), ["/x".to_string()]);
        assert!(err.is_not_found());
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_from_value() {
        let listed = ErrorPayload::from_value(json!(["Permissions Error", "Denied r--", "/a"]));
        assert!(listed.is_permission_denied());
        assert_eq!(listed.detail(), "Denied r--");

        let text = ErrorPayload::from_value(json!("boom"));
        assert_eq!(text.parts(), ["Process Error".to_string(), "boom".to_string()]);

        let other = ErrorPayload::from_value(json!({"code": 3}));
        assert_eq!(other.category(), PROCESS_ERROR);
    }

    #[test]
    fn test_executable_not_found_is_not_found() {
        assert!(ErrorPayload::fs(NOT_FOUND_DETAIL).with_context("nope").is_not_found());
        assert!(!ErrorPayload::fs("Invalid permissions 'abc'").is_not_found());
    }

    #[test]
    fn test_empty_payload_accessors() {
        let empty = ErrorPayload::from_value(json!([]));
        assert_eq!(empty.category(), "");
        assert_eq!(empty.detail(), "");
        assert!(empty.context().is_empty());
    }
}
