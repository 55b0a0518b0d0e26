//! Process snapshots as seen over the wire.

use std::collections::BTreeSet;

use psos_identity::Identity;
use serde::{Deserialize, Serialize};

/// Process identifier. Monotonic, never reused within a supervisor's lifetime.
pub type Pid = u32;

/// Snapshot of a process.
///
/// `parent_id` is `None` for processes started without a parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub id: Pid,
    /// Resolved path of the executable
    pub exec: String,
    pub params: Vec<String>,
    pub identity: Identity,
    #[serde(default)]
    pub parent_id: Option<Pid>,
    #[serde(default)]
    pub children: BTreeSet<Pid>,
    #[serde(default)]
    pub dead: bool,
}

impl ProcessInfo {
    /// `exec[pid]`, the form used in error context.
    pub fn label(&self) -> String {
        format!("{}[{}]", self.exec, self.id)
    }
}
