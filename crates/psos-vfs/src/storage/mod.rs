//! Backing stores for the VFS layer.
//!
//! A [`Store`] is a flat map from normalized path to [`Entry`]. Keying by
//! path alone means a path is either a file or a directory, never both.
//! Stores know nothing about identities or permissions; the
//! [`Vfs`](crate::Vfs) is the only thing that talks to them.
//!
//! Mutations arrive as a batch through [`Store::apply`], which must apply
//! every mutation or none.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::core::{is_under, Entry, VfsError};

/// One change to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Insert or replace the entry at `path`
    Put { path: String, entry: Entry },
    /// Remove the entry at exactly `path`
    Remove(String),
    /// Remove `path` and every entry beneath it
    RemoveTree(String),
}

impl Mutation {
    pub fn put(path: impl Into<String>, entry: Entry) -> Self {
        Mutation::Put {
            path: path.into(),
            entry,
        }
    }
}

/// Path-keyed entry storage.
#[async_trait]
pub trait Store: Send + Sync {
    /// Entry stored at exactly `path`.
    async fn get(&self, path: &str) -> Result<Option<Entry>, VfsError>;

    /// Every entry strictly beneath `dir`, in path order.
    async fn descendants(&self, dir: &str) -> Result<Vec<(String, Entry)>, VfsError>;

    /// Apply a batch atomically.
    async fn apply(&mut self, batch: Vec<Mutation>) -> Result<(), VfsError>;
}

pub(crate) fn apply_batch(tree: &mut BTreeMap<String, Entry>, batch: Vec<Mutation>) {
    for mutation in batch {
        match mutation {
            Mutation::Put { path, entry } => {
                tree.insert(path, entry);
            }
            Mutation::Remove(path) => {
                tree.remove(&path);
            }
            Mutation::RemoveTree(root) => tree.retain(|path, _| !is_under(path, &root)),
        }
    }
}

pub(crate) fn collect_descendants(
    tree: &BTreeMap<String, Entry>,
    dir: &str,
) -> Vec<(String, Entry)> {
    tree.iter()
        .filter(|(path, _)| path.as_str() != dir && is_under(path, dir))
        .map(|(path, entry)| (path.clone(), entry.clone()))
        .collect()
}
