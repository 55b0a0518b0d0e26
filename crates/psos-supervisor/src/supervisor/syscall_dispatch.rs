//! Syscall Dispatch
//!
//! One dispatcher task per process drains its outgoing envelopes in order,
//! so a process never has two syscalls in flight on the supervisor side.
//! Requests carrying an id get exactly one response, unless the caller died
//! in the meantime. A failed fire-and-forget call has nobody waiting on it,
//! so its error payload goes out like a crash report: to the parent, or to
//! the console.
//!
//! Filesystem calls run under the caller's identity as it is when the call
//! is handled.

use std::sync::Arc;

use psos_ipc::{Envelope, ErrorPayload, Pid, ProcessInfo, Syscall};
use psos_process::ProcessError;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::spawn::Spawned;
use super::Supervisor;

/// What a handled syscall produced.
enum Reply {
    Value(Value),
    /// `Process.start`: answer first, then run the child
    Started(Spawned),
}

impl Supervisor {
    pub(super) async fn dispatch(
        self: Arc<Self>,
        pid: Pid,
        mut requests: mpsc::UnboundedReceiver<Envelope>,
    ) {
        while let Some(envelope) = requests.recv().await {
            let Some(caller) = self.process(pid) else {
                break;
            };
            if envelope.is_response() {
                warn!("[supervisor] {} sent a bare response", caller.label());
                continue;
            }

            let Envelope { kind, data, id, .. } = envelope;
            let result = match Syscall::decode(&kind, data) {
                Ok(call) => self.handle_syscall(&caller, call).await,
                Err(err) if err.is_unknown_syscall() => Err(ProcessError::UnknownSyscall {
                    process: caller.label(),
                    service: kind.service.clone(),
                    function: kind.function.clone(),
                }
                .into()),
                Err(err) => Err(err.into()),
            };

            match (id, result) {
                (Some(id), Ok(Reply::Started(spawned))) => {
                    self.respond(pid, Envelope::response(id, Ok(json!(spawned.info()))));
                    self.launch(spawned);
                }
                (None, Ok(Reply::Started(spawned))) => self.launch(spawned),
                (Some(id), Ok(Reply::Value(value))) => {
                    self.respond(pid, Envelope::response(id, Ok(value)))
                }
                (Some(id), Err(err)) => self.respond(pid, Envelope::response(id, Err(err))),
                (None, Ok(Reply::Value(_))) => {}
                (None, Err(err)) => {
                    warn!("[supervisor] {} {} failed: {}", caller.label(), kind, err);
                    self.route_output(pid, Value::from(err.into_parts()));
                }
            }
        }
        debug!("[supervisor] dispatcher for process {} stopped", pid);
    }

    async fn handle_syscall(
        &self,
        caller: &ProcessInfo,
        call: Syscall,
    ) -> Result<Reply, ErrorPayload> {
        let pid = caller.id;
        let identity = &caller.identity;
        let vfs = &self.vfs;

        let value = match call {
            // ========== Std ==========
            Syscall::StdOut(data) => {
                self.route_output(pid, data);
                Value::Null
            }
            Syscall::StdIn(req) => {
                self.write_child(pid, req.pid, req.data, req.source)?;
                Value::Null
            }

            // ========== FS ==========
            Syscall::FsList(path) => json!(vfs.list(&path, identity).await?),
            Syscall::FsMkdir(path) => json!(vfs.mkdir(&path, identity).await?),
            Syscall::FsResolve(paths) => json!(vfs.resolve_working_paths(&paths, identity)),
            Syscall::FsAppend(req) => json!(vfs.append(&req.path, req.content, identity).await?),
            Syscall::FsWrite(req) => json!(vfs.write(&req.path, req.content, identity).await?),
            Syscall::FsTouch(path) => json!(vfs.touch(&path, identity).await?),
            Syscall::FsRead(path) => {
                let content = vfs.read(&path, identity).await?;
                json!(String::from_utf8_lossy(&content))
            }
            Syscall::FsDel(path) => json!(vfs.del(&path, identity).await?),
            Syscall::FsDirExists(path) => json!(vfs.dir_exists(&path, identity).await?),
            Syscall::FsFileExists(path) => json!(vfs.file_exists(&path, identity).await?),
            Syscall::FsDelDir(path) => json!(vfs.del_dir(&path, identity).await?),
            Syscall::FsChmod(req) => {
                vfs.chmod(&req.path, &req.perms, identity).await?;
                Value::Null
            }
            Syscall::FsChown(req) => {
                vfs.chown(
                    &req.path,
                    req.user.as_deref(),
                    req.group.as_deref(),
                    identity,
                )
                .await?;
                Value::Null
            }

            // ========== Process ==========
            Syscall::ProcessEnd => {
                self.end_process(pid);
                Value::Null
            }
            Syscall::ProcessSelf => json!(caller),
            Syscall::ProcessStart(req) => {
                let spawned = self
                    .spawn(&req.exec, req.params, None, Some(pid))
                    .await?;
                return Ok(Reply::Started(spawned));
            }
            Syscall::ProcessCrash(error) => {
                warn!("[supervisor] {} crashed: {}", caller.label(), error);
                self.route_output(pid, error);
                self.end_process(pid);
                Value::Null
            }
            Syscall::ProcessChangeWorkingDir(req) => {
                let target = req.pid.unwrap_or(pid);
                let resolved = psos_vfs::resolve_path(&req.path, identity);
                if !vfs.dir_exists(&resolved, identity).await? {
                    return Err(ErrorPayload::fs(format!(
                        "cd: {}: No such directory",
                        req.path
                    ))
                    .with_context(resolved));
                }
                self.set_env(pid, target, psos_identity::PWD_VAR, &resolved)?;
                json!(resolved)
            }
            Syscall::ProcessSetEnv(req) => {
                let target = req.pid.unwrap_or(pid);
                json!(self.set_env(pid, target, &req.name, &req.value)?)
            }
            Syscall::ProcessKill(target) => {
                self.kill_process(pid, target)?;
                Value::Null
            }
            Syscall::ProcessList => json!(self.processes()),
        };
        Ok(Reply::Value(value))
    }
}
