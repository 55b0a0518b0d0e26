//! Unsolicited notifications pushed into a process.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::MessageType;
use crate::process::Pid;
use crate::service;

/// Keys a program can register a handler for.
///
/// At most one handler is retained per key; registering again replaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookKey {
    /// `Std:in` - inbound data, payload [`StdInMessage`]
    StdIn,
    /// `Process:end` - a direct child died, payload is its PID
    ProcessEnd,
    /// `Process:self` - own snapshot refreshed, payload [`ProcessInfo`](crate::ProcessInfo)
    ProcessSelf,
}

impl HookKey {
    pub fn message_type(self) -> MessageType {
        match self {
            HookKey::StdIn => MessageType::new(service::STD, "in"),
            HookKey::ProcessEnd => MessageType::new(service::PROCESS, "end"),
            HookKey::ProcessSelf => MessageType::new(service::PROCESS, "self"),
        }
    }

    pub fn from_message_type(kind: &MessageType) -> Option<Self> {
        match (kind.service.as_str(), kind.function.as_str()) {
            (service::STD, "in") => Some(HookKey::StdIn),
            (service::PROCESS, "end") => Some(HookKey::ProcessEnd),
            (service::PROCESS, "self") => Some(HookKey::ProcessSelf),
            _ => None,
        }
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.message_type();
        write!(f, "{}:{}", kind.service, kind.function)
    }
}

/// Origin of standard-input data: a process, or a named outside source such
/// as the terminal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Pid(Pid),
    Name(String),
}

impl Source {
    pub fn pid(&self) -> Option<Pid> {
        match self {
            Source::Pid(pid) => Some(*pid),
            Source::Name(_) => None,
        }
    }
}

impl From<Pid> for Source {
    fn from(pid: Pid) -> Self {
        Source::Pid(pid)
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Source::Name(name.to_string())
    }
}

/// Payload of a `Std:in` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StdInMessage {
    pub from: Source,
    #[serde(default)]
    pub data: Value,
}

impl StdInMessage {
    pub fn new(from: impl Into<Source>, data: Value) -> Self {
        Self {
            from: from.into(),
            data,
        }
    }

    /// Data as text; non-string values render as JSON.
    pub fn text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hook_key_names() {
        assert_eq!(HookKey::StdIn.to_string(), "Std:in");
        assert_eq!(HookKey::ProcessEnd.to_string(), "Process:end");
        for key in [HookKey::StdIn, HookKey::ProcessEnd, HookKey::ProcessSelf] {
            assert_eq!(HookKey::from_message_type(&key.message_type()), Some(key));
        }
        assert_eq!(
            HookKey::from_message_type(&MessageType::new("FS", "read")),
            None
        );
    }

    #[test]
    fn test_std_in_message_wire_shape() {
        let from_child = StdInMessage::new(7u32, json!("42"));
        assert_eq!(
            serde_json::to_value(&from_child).unwrap(),
            json!({"from": 7, "data": "42"})
        );

        let from_term: StdInMessage =
            serde_json::from_value(json!({"from": "user", "data": "ls"})).unwrap();
        assert_eq!(from_term.from, Source::Name("user".into()));
        assert_eq!(from_term.from.pid(), None);
        assert_eq!(from_term.text(), "ls");
    }
}
