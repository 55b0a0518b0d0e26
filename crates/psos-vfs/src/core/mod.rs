//! Core VFS types: paths, entries, permission bits and errors.

pub mod error;
pub mod path;
pub mod types;

pub use error::VfsError;
pub use path::{
    ancestors, extension, filename, is_under, normalize_path, parent_path, resolve_path,
};
pub use types::{Action, Entry, EntryKind, Owner, PermBits};
