//! Filesystem results shared by the VFS and its clients.

use serde::{Deserialize, Serialize};

/// One row of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Absolute path of the entry
    pub full: String,
    /// Directory containing the entry
    pub path: String,
    pub name: String,
    /// Extension after the last `.` of the name, empty if none
    pub ext: String,
    pub file: bool,
    pub user: String,
    pub group: String,
    /// Permission digits, e.g. `644`
    pub perm_bits: String,
    /// Rendered form, e.g. `-rw-r--r--`
    pub perms: String,
    /// Byte length for files, zero for directories
    pub size: u64,
}

/// Result of a write: where it landed and what it now holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Written {
    pub path: String,
    pub content: String,
}
