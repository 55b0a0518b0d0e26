//! Spawn errors.

use psos_ipc::ErrorPayload;
use psos_process::ProcessError;
use psos_vfs::VfsError;

/// Why a process could not be started. Nothing is registered when this is
/// returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// Executable lookup or read failed
    #[error(transparent)]
    Fs(#[from] VfsError),

    /// Identity missing, program unknown or parent gone
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl SpawnError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SpawnError::Fs(e) if e.is_not_found())
    }
}

impl From<SpawnError> for ErrorPayload {
    fn from(err: SpawnError) -> Self {
        match err {
            SpawnError::Fs(e) => e.into(),
            SpawnError::Process(e) => e.into(),
        }
    }
}
