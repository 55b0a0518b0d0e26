//! In-memory store.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{apply_batch, collect_descendants, Mutation, Store};
use crate::core::{Entry, VfsError};

/// Store that lives and dies with the process. Each test gets its own.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tree: BTreeMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Entry>, VfsError> {
        Ok(self.tree.get(path).cloned())
    }

    async fn descendants(&self, dir: &str) -> Result<Vec<(String, Entry)>, VfsError> {
        Ok(collect_descendants(&self.tree, dir))
    }

    async fn apply(&mut self, batch: Vec<Mutation>) -> Result<(), VfsError> {
        apply_batch(&mut self.tree, batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Owner;

    fn dir() -> Entry {
        Entry::directory(Owner::new("root", "root"))
    }

    #[tokio::test]
    async fn test_remove_tree_is_prefix_safe() {
        let mut store = MemoryStore::new();
        store
            .apply(vec![
                Mutation::put("/home", dir()),
                Mutation::put("/home/a", dir()),
                Mutation::put("/home/a/f", Entry::file("x", Owner::new("a", "a"))),
                Mutation::put("/home/ab", dir()),
            ])
            .await
            .unwrap();

        store
            .apply(vec![Mutation::RemoveTree("/home/a".into())])
            .await
            .unwrap();

        assert!(store.get("/home/a").await.unwrap().is_none());
        assert!(store.get("/home/a/f").await.unwrap().is_none());
        assert!(store.get("/home/ab").await.unwrap().is_some());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_descendants_excludes_self() {
        let mut store = MemoryStore::new();
        store
            .apply(vec![
                Mutation::put("/bin", dir()),
                Mutation::put("/bin/ls", Entry::file("ls", Owner::new("root", "root"))),
                Mutation::put("/binary", dir()),
            ])
            .await
            .unwrap();

        let found: Vec<String> = store
            .descendants("/bin")
            .await
            .unwrap()
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(found, vec!["/bin/ls"]);
    }
}
