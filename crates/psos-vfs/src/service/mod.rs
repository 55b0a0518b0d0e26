//! The permission-checked filesystem service.

pub mod permissions;
mod vfs;

pub use permissions::{check_permission, has_permission};
pub use vfs::Vfs;
