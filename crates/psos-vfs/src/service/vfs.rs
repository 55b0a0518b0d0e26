use psos_identity::Identity;
use psos_ipc::{ListEntry, Written};
use tokio::sync::Mutex;
use tracing::debug;

use super::permissions::{check_permission, has_permission};
use crate::core::{
    ancestors, extension, filename, normalize_path, parent_path, resolve_path, Action, Entry,
    EntryKind, Owner, PermBits, VfsError,
};
use crate::storage::{MemoryStore, Mutation, Store};

/// Identity-checked virtual filesystem.
///
/// Every operation resolves its path against the caller's identity, checks
/// traversal rights on each ancestor directory, checks the permission bits
/// the operation needs and only then touches the store.
///
/// The store sits behind an async mutex held for the whole operation, so
/// read-modify-write sequences such as [`append`](Self::append) are atomic
/// with respect to every other call.
pub struct Vfs {
    store: Mutex<Box<dyn Store>>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl Vfs {
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    // ========== File Operations ==========

    /// Read a file's content.
    pub async fn read(&self, path: &str, identity: &Identity) -> Result<Vec<u8>, VfsError> {
        let store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        read_resolved(&**store, &path, identity).await
    }

    /// Create or overwrite a file.
    ///
    /// New files need write permission on the parent and get default owner
    /// and bits; existing files need write permission on themselves and keep
    /// their metadata.
    pub async fn write(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
        identity: &Identity,
    ) -> Result<Written, VfsError> {
        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        write_resolved(&mut **store, &path, content.into(), identity).await
    }

    /// Create an empty file if nothing exists at `path`; otherwise leave it
    /// alone.
    ///
    /// For an existing file the returned content is empty unless the caller
    /// may read it.
    pub async fn touch(&self, path: &str, identity: &Identity) -> Result<Written, VfsError> {
        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        match lookup(&**store, &path).await? {
            Some(entry) => {
                let content = if has_permission(&entry, Action::Read, identity) {
                    lossy(entry.content().unwrap_or_default())
                } else {
                    String::new()
                };
                Ok(Written { path, content })
            }
            None => write_resolved(&mut **store, &path, Vec::new(), identity).await,
        }
    }

    /// Append to a file, creating it if absent.
    ///
    /// Only a missing file falls back to a fresh write; any other read
    /// failure (permission, wrong type) is returned as-is.
    pub async fn append(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
        identity: &Identity,
    ) -> Result<Written, VfsError> {
        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        let mut combined = match read_resolved(&**store, &path, identity).await {
            Ok(existing) => existing,
            Err(VfsError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        combined.extend(content.into());
        write_resolved(&mut **store, &path, combined, identity).await
    }

    /// Delete a file. Directories are refused; use [`del_dir`](Self::del_dir).
    pub async fn del(&self, path: &str, identity: &Identity) -> Result<String, VfsError> {
        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        check_parent_writable(&**store, &path, identity).await?;

        match lookup(&**store, &path).await? {
            None => return Err(VfsError::NotFound(path)),
            Some(entry) if entry.is_dir() => return Err(VfsError::NotAFile(path)),
            Some(_) => {}
        }

        store.apply(vec![Mutation::Remove(path.clone())]).await?;
        debug!("[vfs] {} deleted {}", identity.name(), path);
        Ok(path)
    }

    // ========== Directory Operations ==========

    /// Create a directory. Returns `false` if it already existed.
    pub async fn mkdir(&self, path: &str, identity: &Identity) -> Result<bool, VfsError> {
        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;

        match lookup(&**store, &path).await? {
            Some(entry) if entry.is_dir() => return Ok(false),
            Some(_) => return Err(VfsError::AlreadyExists(path)),
            None => {}
        }

        check_parent_writable(&**store, &path, identity).await?;
        store
            .apply(vec![Mutation::put(
                path.clone(),
                Entry::directory(Owner::of(identity)),
            )])
            .await?;
        debug!("[vfs] {} created directory {}", identity.name(), path);
        Ok(true)
    }

    /// Delete a directory and everything beneath it.
    pub async fn del_dir(&self, path: &str, identity: &Identity) -> Result<String, VfsError> {
        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        if path == "/" {
            return Err(VfsError::RootRemoval);
        }
        check_parent_writable(&**store, &path, identity).await?;

        match lookup(&**store, &path).await? {
            None => return Err(VfsError::NotFound(path)),
            Some(entry) if !entry.is_dir() => return Err(VfsError::NotADirectory(path)),
            Some(_) => {}
        }

        store.apply(vec![Mutation::RemoveTree(path.clone())]).await?;
        debug!("[vfs] {} removed tree {}", identity.name(), path);
        Ok(path)
    }

    /// List the direct children of a directory, sorted by full path.
    pub async fn list(&self, path: &str, identity: &Identity) -> Result<Vec<ListEntry>, VfsError> {
        let store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;

        let dir = lookup(&**store, &path)
            .await?
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;
        if !dir.is_dir() {
            return Err(VfsError::NotADirectory(path));
        }
        check_permission(&path, &dir, Action::Read, identity)?;

        let mut entries: Vec<ListEntry> = store
            .descendants(&path)
            .await?
            .into_iter()
            .filter(|(child, _)| parent_path(child) == path)
            .map(|(child, entry)| list_entry(&child, &entry))
            .collect();
        entries.sort_by(|a, b| a.full.cmp(&b.full));
        Ok(entries)
    }

    // ========== Probes ==========

    /// True if `path` is an existing directory.
    ///
    /// A missing ancestor is simply `false`; a denied traversal is an error.
    pub async fn dir_exists(&self, path: &str, identity: &Identity) -> Result<bool, VfsError> {
        Ok(self.probe(path, identity).await?.is_some_and(|e| e.is_dir()))
    }

    /// True if `path` is an existing file. Same rules as
    /// [`dir_exists`](Self::dir_exists).
    pub async fn file_exists(&self, path: &str, identity: &Identity) -> Result<bool, VfsError> {
        Ok(self.probe(path, identity).await?.is_some_and(|e| e.is_file()))
    }

    async fn probe(&self, path: &str, identity: &Identity) -> Result<Option<Entry>, VfsError> {
        let store = self.store.lock().await;
        match resolve(&**store, path, identity).await {
            Ok(path) => lookup(&**store, &path).await,
            Err(VfsError::NotFound(_) | VfsError::NotADirectory(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ========== Metadata ==========

    /// Change permission bits. `perms` is three digits `0`-`7`.
    pub async fn chmod(&self, path: &str, perms: &str, identity: &Identity) -> Result<(), VfsError> {
        let bits = PermBits::parse(perms)?;

        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        let mut entry = lookup(&**store, &path)
            .await?
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;

        if !identity.is_privileged() && entry.owner.user != identity.name() {
            return Err(VfsError::NotOwner(path));
        }

        entry.perms = bits;
        store.apply(vec![Mutation::put(path.clone(), entry)]).await?;
        debug!("[vfs] {} chmod {} {}", identity.name(), bits.digits(), path);
        Ok(())
    }

    /// Change ownership. Requires privilege; a missing user or group
    /// defaults to the caller's user.
    pub async fn chown(
        &self,
        path: &str,
        user: Option<&str>,
        group: Option<&str>,
        identity: &Identity,
    ) -> Result<(), VfsError> {
        let mut store = self.store.lock().await;
        let path = resolve(&**store, path, identity).await?;
        let mut entry = lookup(&**store, &path)
            .await?
            .ok_or_else(|| VfsError::NotFound(path.clone()))?;

        if !identity.is_privileged() {
            return Err(VfsError::RequiresPrivilege(path));
        }

        entry.owner = Owner::new(
            user.unwrap_or(identity.name()).to_lowercase(),
            group.unwrap_or(identity.name()).to_lowercase(),
        );
        debug!("[vfs] {} chown {} {}", identity.name(), entry.owner, path);
        store.apply(vec![Mutation::put(path, entry)]).await
    }

    // ========== Resolution ==========

    /// Canonical absolute forms of `paths`. No permission checks.
    pub fn resolve_working_paths(&self, paths: &[String], identity: &Identity) -> Vec<String> {
        paths.iter().map(|p| resolve_path(p, identity)).collect()
    }

    /// Find an executable.
    ///
    /// Candidates are `name` resolved against the working directory, then
    /// `name` under each directory of the search path. The first candidate
    /// that is a file the identity may execute wins; candidates behind a
    /// failed traversal are skipped.
    pub async fn get_executable(&self, name: &str, identity: &Identity) -> Result<String, VfsError> {
        let store = self.store.lock().await;
        find_executable(&**store, name, identity).await
    }

    /// [`get_executable`](Self::get_executable) followed by a read, as one
    /// atomic step.
    pub async fn executable_read(
        &self,
        name: &str,
        identity: &Identity,
    ) -> Result<(String, Vec<u8>), VfsError> {
        let store = self.store.lock().await;
        let path = find_executable(&**store, name, identity).await?;
        let content = read_resolved(&**store, &path, identity).await?;
        Ok((path, content))
    }
}

/// Entry at `path`; `/` exists even in an empty store.
async fn lookup(store: &dyn Store, path: &str) -> Result<Option<Entry>, VfsError> {
    let entry = store.get(path).await?;
    if entry.is_none() && path == "/" {
        return Ok(Some(Entry::root()));
    }
    Ok(entry)
}

/// Resolve `path` and require execute on every directory above it.
async fn resolve(store: &dyn Store, path: &str, identity: &Identity) -> Result<String, VfsError> {
    let path = resolve_path(path, identity);
    check_traversal(store, &path, identity).await?;
    Ok(path)
}

async fn check_traversal(store: &dyn Store, path: &str, identity: &Identity) -> Result<(), VfsError> {
    for dir in ancestors(path) {
        let entry = lookup(store, &dir)
            .await?
            .ok_or_else(|| VfsError::NotFound(dir.clone()))?;
        if !entry.is_dir() {
            return Err(VfsError::NotADirectory(dir));
        }
        check_permission(&dir, &entry, Action::Execute, identity)?;
    }
    Ok(())
}

async fn check_parent_writable(
    store: &dyn Store,
    path: &str,
    identity: &Identity,
) -> Result<(), VfsError> {
    let parent = parent_path(path);
    let entry = lookup(store, &parent)
        .await?
        .ok_or_else(|| VfsError::NotFound(parent.clone()))?;
    if !entry.is_dir() {
        return Err(VfsError::NotADirectory(parent));
    }
    check_permission(&parent, &entry, Action::Write, identity)
}

async fn read_resolved(store: &dyn Store, path: &str, identity: &Identity) -> Result<Vec<u8>, VfsError> {
    let entry = lookup(store, path)
        .await?
        .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
    check_permission(path, &entry, Action::Read, identity)?;
    entry
        .content()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| VfsError::NotAFile(path.to_string()))
}

async fn write_resolved(
    store: &mut dyn Store,
    path: &str,
    content: Vec<u8>,
    identity: &Identity,
) -> Result<Written, VfsError> {
    let entry = match lookup(store, path).await? {
        Some(existing) if existing.is_dir() => return Err(VfsError::NotAFile(path.to_string())),
        Some(existing) => {
            check_permission(path, &existing, Action::Write, identity)?;
            Entry {
                kind: EntryKind::File {
                    content: content.clone(),
                },
                ..existing
            }
        }
        None => {
            check_parent_writable(store, path, identity).await?;
            Entry::file(content.clone(), Owner::of(identity))
        }
    };

    store.apply(vec![Mutation::put(path, entry)]).await?;
    debug!("[vfs] {} wrote {} bytes to {}", identity.name(), content.len(), path);
    Ok(Written {
        path: path.to_string(),
        content: lossy(&content),
    })
}

async fn find_executable(store: &dyn Store, name: &str, identity: &Identity) -> Result<String, VfsError> {
    let name = name.trim();
    let mut candidates = vec![resolve_path(name, identity)];
    if !name.starts_with('/') && !name.starts_with('~') {
        for dir in identity.search_path() {
            let candidate = normalize_path(&format!("{}/{}", resolve_path(&dir, identity), name));
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    for candidate in candidates {
        if check_traversal(store, &candidate, identity).await.is_err() {
            continue;
        }
        if let Some(entry) = lookup(store, &candidate).await? {
            if entry.is_file() && has_permission(&entry, Action::Execute, identity) {
                return Ok(candidate);
            }
        }
    }

    Err(VfsError::ExecutableNotFound(name.to_string()))
}

fn list_entry(full: &str, entry: &Entry) -> ListEntry {
    ListEntry {
        full: full.to_string(),
        path: parent_path(full),
        name: filename(full).to_string(),
        ext: if entry.is_file() {
            extension(full).to_string()
        } else {
            String::new()
        },
        file: entry.is_file(),
        user: entry.owner.user.clone(),
        group: entry.owner.group.clone(),
        perm_bits: entry.perms.digits(),
        perms: entry.perm_string(),
        size: entry.size(),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
