//! The process table.

use std::collections::BTreeMap;

use psos_ipc::{Envelope, Pid, ProcessInfo};
use psos_process::ProcessError;
use tokio::sync::mpsc;

/// A live process.
pub(crate) struct Slot {
    pub info: ProcessInfo,
    /// Supervisor end of the process inbox
    pub inbox: mpsc::UnboundedSender<Envelope>,
}

/// Live processes keyed by PID.
///
/// PIDs start at 1 and only grow; once they run out, allocation fails.
pub(crate) struct ProcessTable {
    slots: BTreeMap<Pid, Slot>,
    next_pid: Pid,
    pub foreground: Option<Pid>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            next_pid: 1,
            foreground: None,
        }
    }
}

impl ProcessTable {
    pub fn get(&self, pid: Pid) -> Option<&Slot> {
        self.slots.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Slot> {
        self.slots.get_mut(&pid)
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Slot> {
        self.slots.remove(&pid)
    }

    pub fn allocate_pid(&mut self) -> Result<Pid, ProcessError> {
        let pid = self.next_pid;
        self.next_pid = pid.checked_add(1).ok_or(ProcessError::PidsExhausted)?;
        Ok(pid)
    }

    /// Register a process and link it under its parent. The first process
    /// registered while nothing is in the foreground takes the foreground.
    pub fn insert(&mut self, slot: Slot) {
        let pid = slot.info.id;
        if let Some(parent) = slot.info.parent_id.and_then(|p| self.slots.get_mut(&p)) {
            parent.info.children.insert(pid);
        }
        if self.foreground.is_none() {
            self.foreground = Some(pid);
        }
        self.slots.insert(pid, slot);
    }

    pub fn snapshots(&self) -> Vec<ProcessInfo> {
        self.slots.values().map(|slot| slot.info.clone()).collect()
    }
}
