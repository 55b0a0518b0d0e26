//! Filesystem bootstrap for the VFS layer.
//!
//! Creates the standard layout and installs executables:
//! ```text
//! /
//! ├── bin/              root:root  755   one file per installed program
//! └── home/
//!     ├── root/         root:root  755
//!     └── guest/        guest:guest 755
//!         └── bin/      guest:guest 755
//! ```
//!
//! Idempotent: directories that already exist are left as they are, and
//! program files are rewritten with their registry key.

use psos_identity::{home_dir, Identity, HOME_ROOT};
use tracing::info;

use crate::core::{PermBits, VfsError};
use crate::service::Vfs;

/// Directory holding installed programs.
pub const BIN_DIR: &str = "/bin";

/// User that gets a home directory at bootstrap besides `root`.
pub const GUEST_USER: &str = "guest";

/// Create the standard layout and install `programs` under [`BIN_DIR`].
pub async fn bootstrap_filesystem<S: AsRef<str>>(vfs: &Vfs, programs: &[S]) -> Result<(), VfsError> {
    let root = Identity::root();

    vfs.mkdir(BIN_DIR, &root).await?;
    vfs.mkdir(HOME_ROOT, &root).await?;
    vfs.mkdir(&home_dir(psos_identity::ROOT_USER), &root).await?;

    let guest_home = home_dir(GUEST_USER);
    let guest_bin = format!("{}/bin", guest_home);
    for dir in [&guest_home, &guest_bin] {
        if vfs.mkdir(dir, &root).await? {
            vfs.chown(dir, Some(GUEST_USER), Some(GUEST_USER), &root)
                .await?;
        }
    }

    for name in programs {
        install_program(vfs, name.as_ref()).await?;
    }

    info!("[vfs] bootstrap complete, {} programs installed", programs.len());
    Ok(())
}

/// Write `/bin/<name>` holding its registry key and make it executable.
pub async fn install_program(vfs: &Vfs, name: &str) -> Result<String, VfsError> {
    let root = Identity::root();
    let path = format!("{}/{}", BIN_DIR, name);
    vfs.write(&path, name, &root).await?;
    vfs.chmod(&path, &PermBits::EXECUTABLE.digits(), &root)
        .await?;
    Ok(path)
}
