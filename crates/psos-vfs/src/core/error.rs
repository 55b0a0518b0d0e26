//! Error types for the VFS layer.

use psos_ipc::{ErrorPayload, ACCESS_ERROR, FS_ERROR, PERMISSIONS_ERROR};

use super::types::Action;

/// Errors from VFS operations.
///
/// Each variant belongs to one category of the wire taxonomy (see
/// [`VfsError::category`]) and converts into an [`ErrorPayload`] of the form
/// `[category, detail, context]`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VfsError {
    /// Path does not exist
    #[error("Cannot access '{0}': No such file")]
    NotFound(String),

    /// Expected a directory
    #[error("Cannot access '{0}': Not a directory")]
    NotADirectory(String),

    /// Expected a file
    #[error("Cannot access '{0}': Is a directory")]
    NotAFile(String),

    /// Creating over an existing entry of the other type
    #[error("Cannot create '{0}': Path exists")]
    AlreadyExists(String),

    /// Permission bits deny `action` on `path`
    #[error("Denied {}", .action.symbol())]
    Denied { action: Action, path: String },

    /// Only the owner or a privileged identity may chmod
    #[error("Permissions can only be changed by root or owner")]
    NotOwner(String),

    /// chown needs privilege
    #[error("chown requires root")]
    RequiresPrivilege(String),

    /// Permission digits were malformed
    #[error("Invalid permissions '{0}': must be 3 digits 0-7")]
    InvalidPermissions(String),

    /// No executable by that name on the working directory or search path
    #[error("Not found")]
    ExecutableNotFound(String),

    /// Refusing to delete `/`
    #[error("Cannot remove root directory")]
    RootRemoval,

    /// Backing store failure
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl VfsError {
    pub fn denied(action: Action, path: impl Into<String>) -> Self {
        Self::Denied {
            action,
            path: path.into(),
        }
    }

    pub fn storage(msg: impl ToString) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Wire category of this error.
    pub fn category(&self) -> &'static str {
        match self {
            VfsError::NotFound(_)
            | VfsError::NotADirectory(_)
            | VfsError::NotAFile(_)
            | VfsError::AlreadyExists(_) => ACCESS_ERROR,
            VfsError::Denied { .. } | VfsError::NotOwner(_) | VfsError::RequiresPrivilege(_) => {
                PERMISSIONS_ERROR
            }
            VfsError::InvalidPermissions(_)
            | VfsError::ExecutableNotFound(_)
            | VfsError::RootRemoval
            | VfsError::Storage(_) => FS_ERROR,
        }
    }

    /// Path or name the error is about, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            VfsError::NotFound(p)
            | VfsError::NotADirectory(p)
            | VfsError::NotAFile(p)
            | VfsError::AlreadyExists(p)
            | VfsError::NotOwner(p)
            | VfsError::RequiresPrivilege(p)
            | VfsError::InvalidPermissions(p)
            | VfsError::ExecutableNotFound(p) => Some(p),
            VfsError::Denied { path, .. } => Some(path),
            VfsError::RootRemoval => Some("/"),
            VfsError::Storage(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound(_) | VfsError::ExecutableNotFound(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        self.category() == PERMISSIONS_ERROR
    }
}

impl From<VfsError> for ErrorPayload {
    fn from(err: VfsError) -> Self {
        let payload = ErrorPayload::new(err.category(), err.to_string());
        match err.subject() {
            Some(subject) => payload.with_context(subject),
            None => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_payload() {
        let payload: ErrorPayload = VfsError::NotFound("/home/x".into()).into();
        assert_eq!(
            payload.parts(),
            [
                "Access Error".to_string(),
                "Cannot access '/home/x': No such file".to_string(),
                "/home/x".to_string()
            ]
        );
        assert!(payload.is_not_found());
    }

    #[test]
    fn test_denied_payload() {
        let payload: ErrorPayload = VfsError::denied(Action::Read, "/home/root/secret").into();
        assert!(payload.is_permission_denied());
        assert_eq!(payload.detail(), "Denied r--");
        assert_eq!(payload.context(), ["/home/root/secret".to_string()]);
    }

    #[test]
    fn test_executable_not_found_payload() {
        let err = VfsError::ExecutableNotFound("frobnicate".into());
        assert!(err.is_not_found());
        let payload: ErrorPayload = err.into();
        assert_eq!(payload.category(), "FS Error");
        assert!(payload.is_not_found());
    }

    #[test]
    fn test_categories() {
        assert_eq!(VfsError::InvalidPermissions("9".into()).category(), FS_ERROR);
        assert_eq!(VfsError::NotOwner("/a".into()).category(), PERMISSIONS_ERROR);
        assert!(VfsError::RequiresPrivilege("/a".into()).is_permission_denied());
        assert_eq!(VfsError::storage("disk full").subject(), None);
    }
}
