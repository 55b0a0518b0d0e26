//! JSON file store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{apply_batch, collect_descendants, Mutation, Store};
use crate::core::{Entry, VfsError};

/// Store persisted as a single JSON document.
///
/// Each batch is applied to a copy of the tree, the copy is written to a
/// sibling temp file and renamed over the original, and only then does the
/// copy replace the in-memory tree. A failed write leaves both unchanged.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tree: BTreeMap<String, Entry>,
}

impl FileStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, VfsError> {
        let path = path.as_ref().to_path_buf();
        let tree = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(VfsError::storage)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(VfsError::storage(e)),
        };
        debug!("[vfs] opened store {} ({} entries)", path.display(), tree.len());
        Ok(Self { path, tree })
    }

    async fn persist(&self, tree: &BTreeMap<String, Entry>) -> Result<(), VfsError> {
        let bytes = serde_json::to_vec_pretty(tree).map_err(VfsError::storage)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(VfsError::storage)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(VfsError::storage)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, path: &str) -> Result<Option<Entry>, VfsError> {
        Ok(self.tree.get(path).cloned())
    }

    async fn descendants(&self, dir: &str) -> Result<Vec<(String, Entry)>, VfsError> {
        Ok(collect_descendants(&self.tree, dir))
    }

    async fn apply(&mut self, batch: Vec<Mutation>) -> Result<(), VfsError> {
        let mut next = self.tree.clone();
        apply_batch(&mut next, batch);
        self.persist(&next).await?;
        self.tree = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Owner;

    #[tokio::test]
    async fn test_reopen_sees_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fs.json");

        let mut store = FileStore::open(&path).await.unwrap();
        store
            .apply(vec![Mutation::put(
                "/note",
                Entry::file("hi", Owner::new("guest", "guest")),
            )])
            .await
            .unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        let entry = reopened.get("/note").await.unwrap().unwrap();
        assert_eq!(entry.content(), Some(&b"hi"[..]));
        assert_eq!(entry.owner, Owner::new("guest", "guest"));
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_tree_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("fs.json");

        let mut store = FileStore::open(&path).await.unwrap();
        let result = store
            .apply(vec![Mutation::put(
                "/note",
                Entry::file("hi", Owner::new("guest", "guest")),
            )])
            .await;

        assert!(matches!(result, Err(VfsError::Storage(_))));
        assert!(store.get("/note").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fs.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            FileStore::open(&path).await,
            Err(VfsError::Storage(_))
        ));
    }
}
