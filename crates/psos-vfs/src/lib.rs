//! PsOS Virtual Filesystem Layer
//!
//! An identity-checked filesystem over a flat, pluggable store:
//!
//! - **Core**: paths, permission bits, entries and errors
//! - **Service**: the [`Vfs`] itself and the permission rules it enforces
//! - **Storage**: the [`Store`] trait with in-memory and JSON-file backends
//! - **Bootstrap**: the standard directory layout and program installation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Vfs                               │
//! │  resolve path ─► traverse ancestors (x) ─► check bits    │
//! │  read / write / touch / append / mkdir / del / delDir    │
//! │  list / chmod / chown / getExecutable / executableRead   │
//! └──────────────────────────┬───────────────────────────────┘
//!                            │ one lock per operation
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │   dyn Store:  path ─► Entry { File | Directory,          │
//! │                                owner, perms }            │
//! │   MemoryStore (tests)      FileStore (JSON on disk)      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Permission Model
//!
//! Three `rwx` triads, owner:group:other. A privileged identity may always
//! read and write but executes only what some class already marks
//! executable. Reaching a path requires execute on every directory from `/`
//! down to the path's parent.

pub mod bootstrap;
pub mod core;
pub mod service;
pub mod storage;

pub use bootstrap::{bootstrap_filesystem, install_program, BIN_DIR, GUEST_USER};
pub use core::{normalize_path, parent_path, resolve_path};
pub use core::{Action, Entry, EntryKind, Owner, PermBits, VfsError};
pub use psos_ipc::{ListEntry, Written};
pub use service::{has_permission, Vfs};
pub use storage::{FileStore, MemoryStore, Mutation, Store};
