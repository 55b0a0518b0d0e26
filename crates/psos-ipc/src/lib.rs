//! PsOS Syscall Dispatch Protocol
//!
//! This crate defines the wire contract between a client program and the
//! process that owns it:
//!
//! - **Envelopes** ([`Envelope`]): `{type: {service, function}, data, id?, error?}`
//! - **Syscalls** ([`Syscall`]): the closed set of `(service, function)` pairs
//!   a process may invoke
//! - **Events** ([`HookKey`]): unsolicited notifications pushed into a process
//! - **Errors** ([`ErrorPayload`]): the ordered `[category, detail, ...context]`
//!   list consumers pattern-match on
//!
//! It is the single source of truth for service and function names.
//!
//! # Message Flow
//!
//! ```text
//!   client program                     owning process
//!   ──────────────                     ──────────────
//!   {FS.read, "/etc", id: "a1"}  ───►  decode ─► Syscall::FsRead
//!                                      authorize + perform
//!   {response, data, id: "a1"}   ◄───  exactly one reply per id
//!
//!   {Std.out, "42"}              ───►  fire-and-forget (no id)
//!   {Std:in, {from, data}}       ◄───  event, no reply expected
//! ```
//!
//! # Services
//!
//! | Service    | Functions |
//! |------------|-----------|
//! | `Std`      | `out`, `in` |
//! | `FS`       | `list`, `mkdir`, `resolve`, `append`, `write`, `touch`, `read`, `del`, `dirExists`, `fileExists`, `delDir`, `chmod`, `chown` |
//! | `Process`  | `end`, `self`, `start`, `crash`, `changeWorkingDir`, `setEnv`, `kill`, `list` |
//! | `response` | reply to a previously issued request |

pub mod envelope;
pub mod error;
pub mod event;
pub mod fs;
pub mod process;
pub mod syscall;

pub use envelope::{Envelope, MessageType};
pub use error::{
    DecodeError, ErrorPayload, ACCESS_ERROR, FS_ERROR, PERMISSIONS_ERROR, PROCESS_ERROR,
};
pub use event::{HookKey, Source, StdInMessage};
pub use fs::{ListEntry, Written};
pub use process::{Pid, ProcessInfo};
pub use syscall::{
    ChangeDirRequest, ChmodRequest, ChownRequest, PathContent, SetEnvRequest, StartRequest,
    StdInRequest, Syscall,
};

/// Service names.
pub mod service {
    /// Standard input/output routing
    pub const STD: &str = "Std";
    /// Filesystem operations
    pub const FS: &str = "FS";
    /// Process lifecycle
    pub const PROCESS: &str = "Process";
    /// Reply to a previously issued request
    pub const RESPONSE: &str = "response";
}
