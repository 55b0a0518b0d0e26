//! Core types for the VFS layer.

use std::fmt;

use psos_identity::Identity;
use serde::{Deserialize, Serialize};

use super::error::VfsError;

/// An operation gated by permission bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Write,
    Execute,
}

impl Action {
    /// Bit value within a triad: read 4, write 2, execute 1.
    pub fn bit(self) -> u16 {
        match self {
            Action::Read => 4,
            Action::Write => 2,
            Action::Execute => 1,
        }
    }

    /// Triad rendering with only this action set, e.g. `-w-`.
    pub fn symbol(self) -> &'static str {
        match self {
            Action::Read => "r--",
            Action::Write => "-w-",
            Action::Execute => "--x",
        }
    }
}

/// Nine permission bits, owner:group:other, most significant first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermBits(u16);

impl PermBits {
    /// Default for new files: `rw-r--r--`.
    pub const FILE: PermBits = PermBits(0o644);
    /// Default for new directories: `rwxr-xr-x`.
    pub const DIRECTORY: PermBits = PermBits(0o755);
    /// Mode given to installed executables.
    pub const EXECUTABLE: PermBits = PermBits(0o755);

    pub fn from_triads(owner: u16, group: u16, other: u16) -> Self {
        Self(((owner & 7) << 6) | ((group & 7) << 3) | (other & 7))
    }

    /// Parse exactly three digits `0`-`7`, one per triad (e.g. `"750"`).
    ///
    /// Anything else is rejected rather than clamped.
    pub fn parse(digits: &str) -> Result<Self, VfsError> {
        let triads: Vec<u16> = digits
            .chars()
            .map(|c| c.to_digit(8).map(|d| d as u16))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| VfsError::InvalidPermissions(digits.to_string()))?;

        match triads.as_slice() {
            [owner, group, other] => Ok(Self::from_triads(*owner, *group, *other)),
            _ => Err(VfsError::InvalidPermissions(digits.to_string())),
        }
    }

    pub fn owner(self) -> u16 {
        (self.0 >> 6) & 7
    }

    pub fn group(self) -> u16 {
        (self.0 >> 3) & 7
    }

    pub fn other(self) -> u16 {
        self.0 & 7
    }

    /// True if any class carries the execute bit.
    pub fn any_execute(self) -> bool {
        self.0 & 0o111 != 0
    }

    /// Three-digit form, e.g. `644`.
    pub fn digits(self) -> String {
        format!("{}{}{}", self.owner(), self.group(), self.other())
    }

    /// `rwx` form without the type prefix, e.g. `rw-r--r--`.
    pub fn render(self) -> String {
        [self.owner(), self.group(), self.other()]
            .into_iter()
            .map(triad)
            .collect()
    }
}

fn triad(bits: u16) -> String {
    let mut s = String::with_capacity(3);
    s.push(if bits & 4 != 0 { 'r' } else { '-' });
    s.push(if bits & 2 != 0 { 'w' } else { '-' });
    s.push(if bits & 1 != 0 { 'x' } else { '-' });
    s
}

impl fmt::Display for PermBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Owning user and group of an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub user: String,
    pub group: String,
}

impl Owner {
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }

    /// `(identity.user, identity.user)`, the owner of anything an identity
    /// creates.
    pub fn of(identity: &Identity) -> Self {
        Self::new(identity.name(), identity.name())
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.group)
    }
}

/// What an entry holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
    File { content: Vec<u8> },
    Directory,
}

/// A file or directory with its metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(flatten)]
    pub kind: EntryKind,
    pub owner: Owner,
    pub perms: PermBits,
}

impl Entry {
    /// A new file with default permissions.
    pub fn file(content: impl Into<Vec<u8>>, owner: Owner) -> Self {
        Self {
            kind: EntryKind::File {
                content: content.into(),
            },
            owner,
            perms: PermBits::FILE,
        }
    }

    /// A new directory with default permissions.
    pub fn directory(owner: Owner) -> Self {
        Self {
            kind: EntryKind::Directory,
            owner,
            perms: PermBits::DIRECTORY,
        }
    }

    /// The implicit root directory.
    pub fn root() -> Self {
        Self::directory(Owner::new(psos_identity::ROOT_USER, psos_identity::ROOT_USER))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File { .. })
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    pub fn content(&self) -> Option<&[u8]> {
        match &self.kind {
            EntryKind::File { content } => Some(content),
            EntryKind::Directory => None,
        }
    }

    /// Byte length for files, zero for directories.
    pub fn size(&self) -> u64 {
        self.content().map_or(0, |c| c.len() as u64)
    }

    /// Full permission string, e.g. `drwxr-xr-x`.
    pub fn perm_string(&self) -> String {
        let prefix = if self.is_dir() { 'd' } else { '-' };
        format!("{}{}", prefix, self.perms.render())
    }
}
