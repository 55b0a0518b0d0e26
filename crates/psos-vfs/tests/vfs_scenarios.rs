//! End-to-end filesystem scenarios through the public API.

use psos_identity::Identity;
use psos_ipc::ErrorPayload;
use psos_vfs::{bootstrap_filesystem, FileStore, Vfs, VfsError};

async fn booted() -> Vfs {
    let vfs = Vfs::default();
    bootstrap_filesystem(&vfs, &["sh"]).await.unwrap();
    vfs
}

fn guest() -> Identity {
    Identity::user("guest").unwrap()
}

#[tokio::test]
async fn test_guest_project_listing() {
    let vfs = booted().await;
    let id = guest();

    assert!(vfs.mkdir("~/project", &id).await.unwrap());
    vfs.write("~/project/note", "hi", &id).await.unwrap();

    let listing = vfs.list("~/project", &id).await.unwrap();
    assert_eq!(listing.len(), 1);
    let note = &listing[0];
    assert_eq!(note.name, "note");
    assert!(note.file);
    assert_eq!(note.size, 2);
    assert_eq!(format!("{}:{}", note.user, note.group), "guest:guest");
    assert_eq!(note.perms, "-rw-r--r--");
}

#[tokio::test]
async fn test_guest_cannot_read_root_secret() {
    let vfs = booted().await;
    let root = Identity::root();
    vfs.write("/home/root/secret", "s3cr3t", &root).await.unwrap();
    vfs.chmod("/home/root/secret", "600", &root).await.unwrap();

    let err = vfs.read("/home/root/secret", &guest()).await.unwrap_err();
    assert!(err.is_permission_denied());

    let payload = ErrorPayload::from(err);
    assert_eq!(payload.category(), "Permissions Error");
    assert_eq!(payload.context(), ["/home/root/secret".to_string()]);
}

#[tokio::test]
async fn test_append_twice_creates_and_concatenates() {
    let vfs = booted().await;
    let id = guest();

    vfs.append("log", "x", &id).await.unwrap();
    let written = vfs.append("log", "y", &id).await.unwrap();
    assert_eq!(written.content, "xy");
    assert_eq!(vfs.read("log", &id).await.unwrap(), b"xy");
}

#[tokio::test]
async fn test_mkdir_is_idempotent() {
    let vfs = booted().await;
    let id = guest();

    assert!(vfs.mkdir("twice", &id).await.unwrap());
    assert!(!vfs.mkdir("twice", &id).await.unwrap());
    assert!(!vfs.mkdir("/home/guest/twice/.", &id).await.unwrap());
}

#[tokio::test]
async fn test_fresh_entries_owned_by_creator() {
    let vfs = booted().await;
    let id = guest();

    vfs.mkdir("d", &id).await.unwrap();
    vfs.write("f", "", &id).await.unwrap();

    for entry in vfs.list("~", &id).await.unwrap() {
        assert_eq!(entry.user, "guest");
        assert_eq!(entry.group, "guest");
        match entry.name.as_str() {
            "d" => assert_eq!(entry.perms, "drwxr-xr-x"),
            "f" => assert_eq!(entry.perms, "-rw-r--r--"),
            "bin" => {}
            other => panic!("unexpected entry {other}"),
        }
    }
}

#[tokio::test]
async fn test_no_bits_denies_every_operation() {
    let vfs = booted().await;
    let id = guest();

    vfs.write("sealed", "x", &id).await.unwrap();
    vfs.mkdir("sealed_dir", &id).await.unwrap();
    vfs.chmod("sealed", "000", &id).await.unwrap();
    vfs.chmod("sealed_dir", "000", &id).await.unwrap();

    assert!(vfs.read("sealed", &id).await.unwrap_err().is_permission_denied());
    assert!(vfs.write("sealed", "y", &id).await.unwrap_err().is_permission_denied());
    assert!(vfs.list("sealed_dir", &id).await.unwrap_err().is_permission_denied());
    assert!(vfs.write("sealed_dir/f", "", &id).await.unwrap_err().is_permission_denied());
}

#[tokio::test]
async fn test_privileged_reads_anything_but_cannot_execute_without_bits() {
    let vfs = booted().await;
    let root = Identity::root();
    let id = guest();

    vfs.write("private", "mine", &id).await.unwrap();
    vfs.chmod("private", "000", &id).await.unwrap();

    assert_eq!(vfs.read("/home/guest/private", &root).await.unwrap(), b"mine");
    vfs.write("/home/guest/private", "root was here", &root).await.unwrap();

    let err = vfs.get_executable("/home/guest/private", &root).await.unwrap_err();
    assert_eq!(err, VfsError::ExecutableNotFound("/home/guest/private".into()));
}

#[tokio::test]
async fn test_malformed_chmod_changes_nothing() {
    let vfs = booted().await;
    let id = guest();
    vfs.write("f", "", &id).await.unwrap();

    for bad in ["64", "6444", "68a"] {
        assert!(matches!(
            vfs.chmod("f", bad, &id).await,
            Err(VfsError::InvalidPermissions(_))
        ));
    }
    let listing = vfs.list("~", &id).await.unwrap();
    let f = listing.iter().find(|e| e.name == "f").unwrap();
    assert_eq!(f.perm_bits, "644");
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("psos.json");

    {
        let vfs = Vfs::new(FileStore::open(&path).await.unwrap());
        bootstrap_filesystem(&vfs, &["sh"]).await.unwrap();
        vfs.write("~/keep", "persisted", &guest()).await.unwrap();
    }

    let vfs = Vfs::new(FileStore::open(&path).await.unwrap());
    assert_eq!(vfs.read("~/keep", &guest()).await.unwrap(), b"persisted");
}
