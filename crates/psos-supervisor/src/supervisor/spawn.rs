//! Process spawning
//!
//! Starting a process is split in two so a `Process.start` caller can be
//! answered before the child runs:
//!
//! 1. [`Supervisor::spawn`] settles identity, resolves and reads the
//!    executable, looks up the program and registers the process. Any
//!    failure here leaves the table untouched.
//! 2. [`Supervisor::launch`] attaches the program to its [`Os`] and starts
//!    the dispatcher and program tasks.

use std::sync::Arc;

use psos_identity::Identity;
use psos_ipc::{Envelope, Pid, ProcessInfo};
use psos_process::{Os, ProcessError, Program};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::table::Slot;
use super::Supervisor;
use crate::error::SpawnError;

/// A registered process that has not started running yet.
pub struct Spawned {
    info: ProcessInfo,
    program: Box<dyn Program>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
}

impl Spawned {
    pub fn info(&self) -> &ProcessInfo {
        &self.info
    }

    pub fn pid(&self) -> Pid {
        self.info.id
    }
}

impl Supervisor {
    /// Start `exec` with `params`.
    ///
    /// Runs under `identity` if given, otherwise under a copy of the
    /// parent's identity. Empty params are dropped.
    pub async fn start_process(
        self: &Arc<Self>,
        exec: &str,
        params: Vec<String>,
        identity: Option<Identity>,
        parent: Option<Pid>,
    ) -> Result<ProcessInfo, SpawnError> {
        let spawned = self.spawn(exec, params, identity, parent).await?;
        let info = spawned.info.clone();
        self.launch(spawned);
        Ok(info)
    }

    /// Register a process without running it.
    pub async fn spawn(
        &self,
        exec: &str,
        params: Vec<String>,
        identity: Option<Identity>,
        parent: Option<Pid>,
    ) -> Result<Spawned, SpawnError> {
        let identity = match (identity, parent) {
            (Some(identity), _) => identity,
            (None, Some(parent)) => self
                .process(parent)
                .map(|info| info.identity)
                .ok_or(ProcessError::UnknownProcess(parent))?,
            (None, None) => {
                return Err(ProcessError::MissingIdentity {
                    exec: exec.to_string(),
                }
                .into())
            }
        };
        let params: Vec<String> = params.into_iter().filter(|p| !p.is_empty()).collect();

        let (path, content) = self.vfs.executable_read(exec, &identity).await?;
        let key = String::from_utf8_lossy(&content).trim().to_string();
        let program = self
            .programs
            .instantiate(&key)
            .ok_or_else(|| ProcessError::UnknownProgram {
                exec: path.clone(),
                key: key.clone(),
            })?;

        let (tx, inbox) = mpsc::unbounded_channel();
        let info = {
            let mut table = self.table();
            if let Some(parent) = parent {
                if table.get(parent).is_none() {
                    return Err(ProcessError::UnknownProcess(parent).into());
                }
            }
            let info = ProcessInfo {
                id: table.allocate_pid()?,
                exec: path,
                params,
                identity,
                parent_id: parent,
                children: Default::default(),
                dead: false,
            };
            table.insert(Slot {
                info: info.clone(),
                inbox: tx,
            });
            info
        };

        info!(
            "[supervisor] spawned {} as {} (parent {:?})",
            info.label(),
            info.identity.name(),
            info.parent_id
        );
        Ok(Spawned {
            info,
            program,
            inbox,
        })
    }

    /// Run a spawned process.
    pub fn launch(self: &Arc<Self>, spawned: Spawned) {
        let Spawned {
            info,
            program,
            inbox,
        } = spawned;
        let pid = info.id;

        let (outbox, requests) = mpsc::unbounded_channel();
        let os = Os::attach(info, outbox, inbox, self.config.request_timeout());

        tokio::spawn(Arc::clone(self).dispatch(pid, requests));
        tokio::spawn(async move {
            let outcome = program.run(os.clone()).await;
            debug!("[supervisor] program of process {} returned", pid);
            os.finish(outcome);
        });
    }
}
