//! The closed set of syscalls.
//!
//! Every `(service, function)` pair a process may invoke is a variant of
//! [`Syscall`]. [`Syscall::decode`] is the only place a string pair becomes a
//! typed request; anything it does not recognise is a
//! [`DecodeError::UnknownSyscall`], never silently dropped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::envelope::{Envelope, MessageType};
use crate::error::DecodeError;
use crate::event::Source;
use crate::process::Pid;
use crate::service::{FS, PROCESS, STD};

/// `{path, content}` argument of `FS.write` and `FS.append`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathContent {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

/// Argument of `FS.chmod`. `perms` is three permission digits, e.g. `"750"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChmodRequest {
    pub path: String,
    pub perms: String,
}

/// Argument of `FS.chown`. Missing fields default to the caller's user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChownRequest {
    pub path: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// Argument of `Std.in`: push `data` into direct child `pid`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StdInRequest {
    pub pid: Pid,
    #[serde(default)]
    pub data: Value,
    /// Reported as `from`; defaults to the caller's PID
    #[serde(default)]
    pub source: Option<Source>,
}

/// Argument of `Process.start`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub exec: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Argument of `Process.changeWorkingDir`. Also accepted as a bare path string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDirRequest {
    pub path: String,
    /// Target process; defaults to the caller
    #[serde(default)]
    pub pid: Option<Pid>,
}

/// Argument of `Process.setEnv`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetEnvRequest {
    /// Target process; defaults to the caller
    #[serde(default)]
    pub pid: Option<Pid>,
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A decoded syscall.
#[derive(Clone, Debug, PartialEq)]
pub enum Syscall {
    /// `Std.out` - write to the parent, or the console without one
    StdOut(Value),
    /// `Std.in` - write into a direct child
    StdIn(StdInRequest),

    FsList(String),
    FsMkdir(String),
    FsResolve(Vec<String>),
    FsAppend(PathContent),
    FsWrite(PathContent),
    FsTouch(String),
    FsRead(String),
    FsDel(String),
    FsDirExists(String),
    FsFileExists(String),
    FsDelDir(String),
    FsChmod(ChmodRequest),
    FsChown(ChownRequest),

    /// `Process.end` - end the caller
    ProcessEnd,
    /// `Process.self` - snapshot of the caller
    ProcessSelf,
    ProcessStart(StartRequest),
    /// `Process.crash` - report failure then end
    ProcessCrash(Value),
    ProcessChangeWorkingDir(ChangeDirRequest),
    ProcessSetEnv(SetEnvRequest),
    ProcessKill(Pid),
    /// `Process.list` - live processes
    ProcessList,
}

impl Syscall {
    /// Turn a wire pair and payload into a typed syscall.
    pub fn decode(kind: &MessageType, data: Value) -> Result<Self, DecodeError> {
        let call = match (kind.service.as_str(), kind.function.as_str()) {
            (STD, "out") => Syscall::StdOut(data),
            (STD, "in") => Syscall::StdIn(arg(kind, data)?),

            (FS, "list") => Syscall::FsList(arg(kind, data)?),
            (FS, "mkdir") => Syscall::FsMkdir(arg(kind, data)?),
            (FS, "resolve") => Syscall::FsResolve(arg(kind, data)?),
            (FS, "append") => Syscall::FsAppend(arg(kind, data)?),
            (FS, "write") => Syscall::FsWrite(arg(kind, data)?),
            (FS, "touch") => Syscall::FsTouch(arg(kind, data)?),
            (FS, "read") => Syscall::FsRead(arg(kind, data)?),
            (FS, "del") => Syscall::FsDel(arg(kind, data)?),
            (FS, "dirExists") => Syscall::FsDirExists(arg(kind, data)?),
            (FS, "fileExists") => Syscall::FsFileExists(arg(kind, data)?),
            (FS, "delDir") => Syscall::FsDelDir(arg(kind, data)?),
            (FS, "chmod") => Syscall::FsChmod(arg(kind, data)?),
            (FS, "chown") => Syscall::FsChown(arg(kind, data)?),

            (PROCESS, "end") => Syscall::ProcessEnd,
            (PROCESS, "self") => Syscall::ProcessSelf,
            (PROCESS, "start") => Syscall::ProcessStart(arg(kind, data)?),
            (PROCESS, "crash") => Syscall::ProcessCrash(data),
            (PROCESS, "changeWorkingDir") => match data {
                Value::String(path) => {
                    Syscall::ProcessChangeWorkingDir(ChangeDirRequest { path, pid: None })
                }
                other => Syscall::ProcessChangeWorkingDir(arg(kind, other)?),
            },
            (PROCESS, "setEnv") => Syscall::ProcessSetEnv(arg(kind, data)?),
            (PROCESS, "kill") => Syscall::ProcessKill(arg(kind, data)?),
            (PROCESS, "list") => Syscall::ProcessList,

            _ => {
                return Err(DecodeError::UnknownSyscall {
                    service: kind.service.clone(),
                    function: kind.function.clone(),
                })
            }
        };
        Ok(call)
    }

    /// The wire pair for this syscall.
    pub fn message_type(&self) -> MessageType {
        let (service, function) = match self {
            Syscall::StdOut(_) => (STD, "out"),
            Syscall::StdIn(_) => (STD, "in"),
            Syscall::FsList(_) => (FS, "list"),
            Syscall::FsMkdir(_) => (FS, "mkdir"),
            Syscall::FsResolve(_) => (FS, "resolve"),
            Syscall::FsAppend(_) => (FS, "append"),
            Syscall::FsWrite(_) => (FS, "write"),
            Syscall::FsTouch(_) => (FS, "touch"),
            Syscall::FsRead(_) => (FS, "read"),
            Syscall::FsDel(_) => (FS, "del"),
            Syscall::FsDirExists(_) => (FS, "dirExists"),
            Syscall::FsFileExists(_) => (FS, "fileExists"),
            Syscall::FsDelDir(_) => (FS, "delDir"),
            Syscall::FsChmod(_) => (FS, "chmod"),
            Syscall::FsChown(_) => (FS, "chown"),
            Syscall::ProcessEnd => (PROCESS, "end"),
            Syscall::ProcessSelf => (PROCESS, "self"),
            Syscall::ProcessStart(_) => (PROCESS, "start"),
            Syscall::ProcessCrash(_) => (PROCESS, "crash"),
            Syscall::ProcessChangeWorkingDir(_) => (PROCESS, "changeWorkingDir"),
            Syscall::ProcessSetEnv(_) => (PROCESS, "setEnv"),
            Syscall::ProcessKill(_) => (PROCESS, "kill"),
            Syscall::ProcessList => (PROCESS, "list"),
        };
        MessageType::new(service, function)
    }

    /// The wire payload for this syscall.
    pub fn payload(&self) -> Value {
        match self {
            Syscall::StdOut(data) | Syscall::ProcessCrash(data) => data.clone(),
            Syscall::StdIn(req) => json!({"pid": req.pid, "data": req.data, "source": req.source}),
            Syscall::FsList(path)
            | Syscall::FsMkdir(path)
            | Syscall::FsTouch(path)
            | Syscall::FsRead(path)
            | Syscall::FsDel(path)
            | Syscall::FsDirExists(path)
            | Syscall::FsFileExists(path)
            | Syscall::FsDelDir(path) => json!(path),
            Syscall::FsResolve(paths) => json!(paths),
            Syscall::FsAppend(req) | Syscall::FsWrite(req) => {
                json!({"path": req.path, "content": req.content})
            }
            Syscall::FsChmod(req) => json!({"path": req.path, "perms": req.perms}),
            Syscall::FsChown(req) => {
                json!({"path": req.path, "user": req.user, "group": req.group})
            }
            Syscall::ProcessEnd | Syscall::ProcessSelf | Syscall::ProcessList => Value::Null,
            Syscall::ProcessStart(req) => json!({"exec": req.exec, "params": req.params}),
            Syscall::ProcessChangeWorkingDir(req) => json!({"path": req.path, "pid": req.pid}),
            Syscall::ProcessSetEnv(req) => {
                json!({"pid": req.pid, "name": req.name, "value": req.value})
            }
            Syscall::ProcessKill(pid) => json!(pid),
        }
    }

    /// Wrap in an envelope; `id` makes it a request, `None` fire-and-forget.
    pub fn into_envelope(self, id: Option<String>) -> Envelope {
        let kind = self.message_type();
        let data = self.payload();
        match id {
            Some(id) => Envelope::request(kind, data, id),
            None => Envelope::notify(kind, data),
        }
    }
}

fn arg<T: DeserializeOwned>(kind: &MessageType, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|e| DecodeError::InvalidPayload {
        service: kind.service.clone(),
        function: kind.function.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(service: &str, function: &str, data: Value) -> Result<Syscall, DecodeError> {
        Syscall::decode(&MessageType::new(service, function), data)
    }

    #[test]
    fn test_decode_fs_calls() {
        assert_eq!(
            decode("FS", "read", json!("/etc/motd")).unwrap(),
            Syscall::FsRead("/etc/motd".into())
        );
        assert_eq!(
            decode("FS", "write", json!({"path": "a", "content": "hi"})).unwrap(),
            Syscall::FsWrite(PathContent {
                path: "a".into(),
                content: "hi".into()
            })
        );
        assert_eq!(
            decode("FS", "chown", json!({"path": "a"})).unwrap(),
            Syscall::FsChown(ChownRequest {
                path: "a".into(),
                user: None,
                group: None
            })
        );
    }

    #[test]
    fn test_decode_unknown_pair() {
        let err = decode("FS", "rename", json!(["a", "b"])).unwrap_err();
        assert!(err.is_unknown_syscall());
        assert_eq!(
            err,
            DecodeError::UnknownSyscall {
                service: "FS".into(),
                function: "rename".into()
            }
        );

        let err = decode("Display", "print", Value::Null).unwrap_err();
        assert!(err.is_unknown_syscall());
    }

    #[test]
    fn test_decode_bad_payload() {
        let err = decode("FS", "read", json!(42)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload { .. }));
        assert!(!err.is_unknown_syscall());
    }

    #[test]
    fn test_change_dir_accepts_bare_path() {
        assert_eq!(
            decode("Process", "changeWorkingDir", json!("/tmp")).unwrap(),
            Syscall::ProcessChangeWorkingDir(ChangeDirRequest {
                path: "/tmp".into(),
                pid: None
            })
        );
        assert_eq!(
            decode("Process", "changeWorkingDir", json!({"path": "/tmp", "pid": 3})).unwrap(),
            Syscall::ProcessChangeWorkingDir(ChangeDirRequest {
                path: "/tmp".into(),
                pid: Some(3)
            })
        );
    }

    #[test]
    fn test_std_in_source_is_optional() {
        let call = decode("Std", "in", json!({"pid": 4, "data": "x"})).unwrap();
        match call {
            Syscall::StdIn(req) => {
                assert_eq!(req.pid, 4);
                assert_eq!(req.source, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_envelope_decodes_back() {
        let calls = vec![
            Syscall::StdOut(json!("42")),
            Syscall::FsResolve(vec!["~".into(), "..".into()]),
            Syscall::FsChmod(ChmodRequest {
                path: "/bin/ls".into(),
                perms: "755".into(),
            }),
            Syscall::ProcessStart(StartRequest {
                exec: "ls".into(),
                params: vec!["-l".into()],
            }),
            Syscall::ProcessSetEnv(SetEnvRequest {
                pid: Some(2),
                name: "PWD".into(),
                value: "/".into(),
            }),
            Syscall::ProcessKill(9),
            Syscall::ProcessList,
        ];
        for call in calls {
            let env = call.clone().into_envelope(Some("id".into()));
            assert_eq!(Syscall::decode(&env.kind, env.data).unwrap(), call);
        }
    }
}
