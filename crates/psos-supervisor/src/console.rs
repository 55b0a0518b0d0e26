//! Console sinks.
//!
//! Output from a process without a live parent (and crash reports from such
//! processes) ends up on the console. The supervisor does not render
//! anything itself; it hands each item to a [`Console`].

use psos_ipc::Pid;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::info;

/// One item written to the console.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleLine {
    pub pid: Pid,
    pub data: Value,
}

impl ConsoleLine {
    /// Data as text; non-string values render as JSON.
    pub fn text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Where parentless output goes.
pub trait Console: Send + Sync {
    fn print(&self, pid: Pid, data: &Value);
}

/// Console that only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn print(&self, pid: Pid, data: &Value) {
        info!("[console] {}: {}", pid, data);
    }
}

/// Console that forwards every item into a channel.
#[derive(Clone, Debug)]
pub struct ChannelConsole {
    tx: mpsc::UnboundedSender<ConsoleLine>,
}

impl ChannelConsole {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConsoleLine>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Console for ChannelConsole {
    fn print(&self, pid: Pid, data: &Value) {
        let _ = self.tx.send(ConsoleLine {
            pid,
            data: data.clone(),
        });
    }
}
