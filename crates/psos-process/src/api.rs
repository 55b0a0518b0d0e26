//! Typed wrappers over the raw syscalls, grouped by service.

use psos_ipc::{
    ChangeDirRequest, ChmodRequest, ChownRequest, ErrorPayload, ListEntry, PathContent, Pid,
    ProcessInfo, SetEnvRequest, Source, StartRequest, StdInRequest, Syscall, Written,
};
use serde_json::Value;

use crate::error::ProcessError;
use crate::os::Os;

/// `FS` service.
pub struct Fs<'a> {
    os: &'a Os,
}

impl<'a> Fs<'a> {
    pub(crate) fn new(os: &'a Os) -> Self {
        Self { os }
    }

    pub async fn read(&self, path: &str) -> Result<String, ErrorPayload> {
        self.os.call_as(Syscall::FsRead(path.into())).await
    }

    pub async fn write(&self, path: &str, content: &str) -> Result<Written, ErrorPayload> {
        self.os
            .call_as(Syscall::FsWrite(path_content(path, content)))
            .await
    }

    pub async fn append(&self, path: &str, content: &str) -> Result<Written, ErrorPayload> {
        self.os
            .call_as(Syscall::FsAppend(path_content(path, content)))
            .await
    }

    pub async fn touch(&self, path: &str) -> Result<Written, ErrorPayload> {
        self.os.call_as(Syscall::FsTouch(path.into())).await
    }

    /// `false` if the directory already existed.
    pub async fn mkdir(&self, path: &str) -> Result<bool, ErrorPayload> {
        self.os.call_as(Syscall::FsMkdir(path.into())).await
    }

    pub async fn del(&self, path: &str) -> Result<String, ErrorPayload> {
        self.os.call_as(Syscall::FsDel(path.into())).await
    }

    pub async fn del_dir(&self, path: &str) -> Result<String, ErrorPayload> {
        self.os.call_as(Syscall::FsDelDir(path.into())).await
    }

    pub async fn list(&self, path: &str) -> Result<Vec<ListEntry>, ErrorPayload> {
        self.os.call_as(Syscall::FsList(path.into())).await
    }

    pub async fn resolve(&self, paths: Vec<String>) -> Result<Vec<String>, ErrorPayload> {
        self.os.call_as(Syscall::FsResolve(paths)).await
    }

    pub async fn dir_exists(&self, path: &str) -> Result<bool, ErrorPayload> {
        self.os.call_as(Syscall::FsDirExists(path.into())).await
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool, ErrorPayload> {
        self.os.call_as(Syscall::FsFileExists(path.into())).await
    }

    pub async fn chmod(&self, path: &str, perms: &str) -> Result<(), ErrorPayload> {
        self.os
            .call_as(Syscall::FsChmod(ChmodRequest {
                path: path.into(),
                perms: perms.into(),
            }))
            .await
    }

    pub async fn chown(
        &self,
        path: &str,
        user: Option<&str>,
        group: Option<&str>,
    ) -> Result<(), ErrorPayload> {
        self.os
            .call_as(Syscall::FsChown(ChownRequest {
                path: path.into(),
                user: user.map(String::from),
                group: group.map(String::from),
            }))
            .await
    }
}

fn path_content(path: &str, content: &str) -> PathContent {
    PathContent {
        path: path.into(),
        content: content.into(),
    }
}

/// `Process` service.
pub struct ProcessApi<'a> {
    os: &'a Os,
}

impl<'a> ProcessApi<'a> {
    pub(crate) fn new(os: &'a Os) -> Self {
        Self { os }
    }

    /// Fresh snapshot of the calling process.
    pub async fn self_info(&self) -> Result<ProcessInfo, ErrorPayload> {
        self.os.call_as(Syscall::ProcessSelf).await
    }

    /// Start a child; resolves once it is registered.
    pub async fn start(&self, exec: &str, params: Vec<String>) -> Result<ProcessInfo, ErrorPayload> {
        self.os
            .call_as(Syscall::ProcessStart(StartRequest {
                exec: exec.into(),
                params,
            }))
            .await
    }

    /// End the calling process. The reply can never arrive, so "ended" is
    /// success.
    pub async fn end(&self) -> Result<(), ErrorPayload> {
        ignore_ended(self.os.call(Syscall::ProcessEnd).await)
    }

    /// Report `error` to the parent (or console) and end.
    pub async fn crash(&self, error: impl Into<Value>) -> Result<(), ErrorPayload> {
        ignore_ended(self.os.call(Syscall::ProcessCrash(error.into())).await)
    }

    /// Change the caller's working directory; returns the resolved path.
    pub async fn change_working_dir(&self, path: &str) -> Result<String, ErrorPayload> {
        self.change_working_dir_of(None, path).await
    }

    /// Change another process's working directory.
    pub async fn change_working_dir_of(
        &self,
        pid: Option<Pid>,
        path: &str,
    ) -> Result<String, ErrorPayload> {
        self.os
            .call_as(Syscall::ProcessChangeWorkingDir(ChangeDirRequest {
                path: path.into(),
                pid,
            }))
            .await
    }

    /// Set an environment variable on `pid` (the caller if `None`).
    pub async fn set_env(
        &self,
        pid: Option<Pid>,
        name: &str,
        value: &str,
    ) -> Result<ProcessInfo, ErrorPayload> {
        self.os
            .call_as(Syscall::ProcessSetEnv(SetEnvRequest {
                pid,
                name: name.into(),
                value: value.into(),
            }))
            .await
    }

    pub async fn kill(&self, pid: Pid) -> Result<(), ErrorPayload> {
        self.os.call_as(Syscall::ProcessKill(pid)).await
    }

    /// Live processes.
    pub async fn list(&self) -> Result<Vec<ProcessInfo>, ErrorPayload> {
        self.os.call_as(Syscall::ProcessList).await
    }
}

fn ignore_ended(result: Result<Value, ErrorPayload>) -> Result<(), ErrorPayload> {
    let ended: ErrorPayload = ProcessError::Ended.into();
    match result {
        Ok(_) => Ok(()),
        Err(err) if err == ended => Ok(()),
        Err(err) => Err(err),
    }
}

/// `Std` service.
pub struct Std<'a> {
    os: &'a Os,
}

impl<'a> Std<'a> {
    pub(crate) fn new(os: &'a Os) -> Self {
        Self { os }
    }

    /// Write to the parent, or the console if there is none.
    pub async fn out(&self, data: impl Into<Value>) -> Result<(), ErrorPayload> {
        self.os.call_as(Syscall::StdOut(data.into())).await
    }

    /// Push `data` into direct child `pid`, reported as coming from the
    /// caller.
    pub async fn write_child(&self, pid: Pid, data: impl Into<Value>) -> Result<(), ErrorPayload> {
        self.write_child_as(pid, data, None).await
    }

    /// Push `data` into direct child `pid` on behalf of `source`.
    pub async fn write_child_as(
        &self,
        pid: Pid,
        data: impl Into<Value>,
        source: Option<Source>,
    ) -> Result<(), ErrorPayload> {
        self.os
            .call_as(Syscall::StdIn(StdInRequest {
                pid,
                data: data.into(),
                source,
            }))
            .await
    }
}
