//! The Supervisor
//!
//! Owns the process table and is the only component that creates, routes to
//! and ends processes.
//!
//! # Process lifecycle
//!
//! ```text
//! start_process ──► spawn (identity, executable, register) ──► launch
//!                                                               │
//!                          ┌────────────────────────────────────┤
//!                          ▼                                    ▼
//!                  dispatcher task                        program task
//!               (syscalls, one at a time)        (runs, then Process.end/crash)
//!                          │
//!                          ▼
//!                     end_process ──► Process:end to parent, slot removed
//! ```
//!
//! A process is alive exactly as long as its slot is in the table. Removing
//! the slot drops the supervisor's end of the process inbox, which closes the
//! program's [`Os`](psos_process::Os) and fails anything still pending there.
//! Ending a process never touches its children; they stay registered and
//! their output falls through to the console.
//!
//! # Routing
//!
//! | From                  | To                                              |
//! |-----------------------|-------------------------------------------------|
//! | outside (`std_in`)    | foreground process                              |
//! | process `Std.out`     | parent `Std:in`, or console without live parent |
//! | process `Std.in`      | a direct child's `Std:in`                       |

mod spawn;
mod syscall_dispatch;
mod table;

use std::sync::{Arc, MutexGuard, PoisonError};

use psos_identity::{Identity, IdentityError, PATH_VAR, PWD_VAR, ROOT_USER};
use psos_ipc::{Envelope, HookKey, Pid, ProcessInfo, Source, StdInMessage};
use psos_process::ProcessError;
use psos_vfs::{normalize_path, Vfs};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::SupervisorConfig;
use crate::console::Console;
use crate::programs::ProgramRegistry;
use table::ProcessTable;

pub use spawn::Spawned;

/// Process supervisor.
///
/// Always used behind an [`Arc`]; per-process tasks hold a clone.
pub struct Supervisor {
    vfs: Arc<Vfs>,
    programs: ProgramRegistry,
    console: Arc<dyn Console>,
    config: SupervisorConfig,
    table: std::sync::Mutex<ProcessTable>,
    /// Bumped every time a process ends
    exits: watch::Sender<u64>,
}

impl Supervisor {
    pub fn new(
        vfs: Arc<Vfs>,
        programs: ProgramRegistry,
        console: Arc<dyn Console>,
        config: SupervisorConfig,
    ) -> Arc<Self> {
        let (exits, _) = watch::channel(0);
        Arc::new(Self {
            vfs,
            programs,
            console,
            config,
            table: std::sync::Mutex::new(ProcessTable::default()),
            exits,
        })
    }

    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Identity for `user` in its home directory, searching the configured
    /// default path and then `~/bin`. `root` gets the privileged identity.
    pub fn login(&self, user: &str) -> Result<Identity, IdentityError> {
        let mut identity = if user.trim().eq_ignore_ascii_case(ROOT_USER) {
            Identity::root()
        } else {
            Identity::user(user)?
        };
        identity.set_env(PATH_VAR, &self.config.default_search_path)?;
        let home_bin = format!("{}/bin", identity.home_dir());
        identity.add_to_path(&home_bin);
        Ok(identity)
    }

    fn table(&self) -> MutexGuard<'_, ProcessTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== Queries ==========

    /// Snapshot of a live process.
    pub fn process(&self, pid: Pid) -> Option<ProcessInfo> {
        self.table().get(pid).map(|slot| slot.info.clone())
    }

    pub fn is_alive(&self, pid: Pid) -> bool {
        self.table().get(pid).is_some()
    }

    /// Live processes ordered by PID.
    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.table().snapshots()
    }

    /// The process that receives outside input.
    pub fn foreground(&self) -> Option<Pid> {
        self.table().foreground
    }

    /// Make a live process the foreground one.
    pub fn set_foreground(&self, pid: Pid) -> Result<(), ProcessError> {
        let mut table = self.table();
        if table.get(pid).is_none() {
            return Err(ProcessError::UnknownProcess(pid));
        }
        table.foreground = Some(pid);
        Ok(())
    }

    /// Wait until `pid` is no longer alive.
    pub async fn wait_for_exit(&self, pid: Pid) {
        let mut exits = self.exits.subscribe();
        loop {
            if !self.is_alive(pid) {
                return;
            }
            if exits.changed().await.is_err() {
                return;
            }
        }
    }

    // ========== Routing ==========

    /// Push outside input into the foreground process.
    ///
    /// Returns `false` when there is no foreground process.
    pub fn std_in(&self, source: &str, data: impl Into<Value>) -> bool {
        let Some(pid) = self.foreground() else {
            warn!("[supervisor] input from {} with no foreground process", source);
            return false;
        };
        let msg = StdInMessage::new(source, data.into());
        self.send_event(pid, HookKey::StdIn, json!(msg))
    }

    /// Output of `pid`: to its parent's `Std:in` when the parent is alive,
    /// otherwise to the console.
    pub(crate) fn route_output(&self, pid: Pid, data: Value) {
        let parent = self.table().get(pid).and_then(|slot| slot.info.parent_id);
        if let Some(parent) = parent {
            let msg = StdInMessage::new(pid, data.clone());
            if self.send_event(parent, HookKey::StdIn, json!(msg)) {
                return;
            }
        }

        if self.config.console_echo {
            info!("[supervisor] console <- {}: {}", pid, data);
        }
        self.console.print(pid, &data);
    }

    /// Push `data` into `child`'s `Std:in`. Only a direct parent may do so.
    pub(crate) fn write_child(
        &self,
        caller: Pid,
        child: Pid,
        data: Value,
        source: Option<Source>,
    ) -> Result<(), ProcessError> {
        let parent = self
            .table()
            .get(child)
            .map(|slot| slot.info.parent_id)
            .ok_or(ProcessError::UnknownProcess(child))?;
        if parent != Some(caller) {
            return Err(ProcessError::unauthorized("write to", child));
        }

        let msg = StdInMessage {
            from: source.unwrap_or(Source::Pid(caller)),
            data,
        };
        if !self.send_event(child, HookKey::StdIn, json!(msg)) {
            return Err(ProcessError::UnknownProcess(child));
        }
        Ok(())
    }

    /// Deliver an event into a live process. `false` if it is gone.
    pub(crate) fn send_event(&self, pid: Pid, key: HookKey, data: Value) -> bool {
        let inbox = self.table().get(pid).map(|slot| slot.inbox.clone());
        match inbox {
            Some(inbox) => inbox.send(Envelope::notify(key.message_type(), data)).is_ok(),
            None => false,
        }
    }

    /// Deliver a syscall response. Dropped if the caller died meanwhile.
    pub(crate) fn respond(&self, pid: Pid, envelope: Envelope) {
        let inbox = self.table().get(pid).map(|slot| slot.inbox.clone());
        match inbox {
            Some(inbox) => {
                let _ = inbox.send(envelope);
            }
            None => debug!("[supervisor] dropping response for dead process {}", pid),
        }
    }

    // ========== Lifecycle ==========

    /// End `pid`: remove it from the table and from its parent's children,
    /// tell the parent with `Process:end`, and clear the foreground if it
    /// pointed here.
    ///
    /// Safe to call on unknown or already-ended PIDs; returns the final
    /// snapshot only the first time.
    pub fn end_process(&self, pid: Pid) -> Option<ProcessInfo> {
        let (mut slot, parent_inbox) = {
            let mut table = self.table();
            let slot = table.remove(pid)?;
            let parent_inbox = slot.info.parent_id.and_then(|parent| {
                let parent = table.get_mut(parent)?;
                parent.info.children.remove(&pid);
                Some(parent.inbox.clone())
            });
            if table.foreground == Some(pid) {
                table.foreground = None;
            }
            (slot, parent_inbox)
        };

        slot.info.dead = true;
        if let Some(inbox) = parent_inbox {
            let _ = inbox.send(Envelope::notify(
                HookKey::ProcessEnd.message_type(),
                json!(pid),
            ));
        }
        self.exits.send_modify(|n| *n += 1);

        info!("[supervisor] process {} ended", slot.info.label());
        Some(slot.info)
    }

    /// `caller` ends `target`. Allowed for a privileged caller or one running
    /// as the same user. Ending a process that is already gone is a no-op.
    pub fn kill_process(&self, caller: Pid, target: Pid) -> Result<(), ProcessError> {
        let (caller_id, target_id) = {
            let table = self.table();
            let caller_id = table
                .get(caller)
                .map(|slot| slot.info.identity.clone())
                .ok_or(ProcessError::UnknownProcess(caller))?;
            let Some(target_slot) = table.get(target) else {
                return Ok(());
            };
            (caller_id, target_slot.info.identity.clone())
        };

        if !caller_id.is_privileged() && caller_id.name() != target_id.name() {
            return Err(ProcessError::unauthorized("kill", target));
        }
        self.end_process(target);
        Ok(())
    }

    // ========== Environment ==========

    /// Set `name` in `target`'s environment on behalf of `caller`.
    ///
    /// `caller` must be `target` itself or its parent. `PWD` is normalized and
    /// moves the working directory. The target gets a `Process:self` event
    /// with its new snapshot.
    pub fn set_env(
        &self,
        caller: Pid,
        target: Pid,
        name: &str,
        value: &str,
    ) -> Result<ProcessInfo, ProcessError> {
        let value = if name == PWD_VAR {
            if !value.starts_with('/') {
                return Err(ProcessError::InvalidEnv(format!(
                    "working directory must be absolute: {}",
                    value
                )));
            }
            normalize_path(value)
        } else {
            value.to_string()
        };

        let info = {
            let mut table = self.table();
            let slot = table
                .get_mut(target)
                .ok_or(ProcessError::UnknownProcess(target))?;
            if caller != target && slot.info.parent_id != Some(caller) {
                return Err(ProcessError::unauthorized("change environment of", target));
            }
            slot.info
                .identity
                .set_env(name, &value)
                .map_err(|e| ProcessError::InvalidEnv(e.to_string()))?;
            slot.info.clone()
        };

        debug!("[supervisor] process {} set {}={}", target, name, value);
        self.send_event(target, HookKey::ProcessSelf, json!(info));
        Ok(info)
    }
}
