//! Errors raised by the process layer.

use psos_ipc::{ErrorPayload, Pid, PERMISSIONS_ERROR, PROCESS_ERROR};

/// Process lifecycle and protocol errors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// No reply arrived within the configured timeout
    #[error("Request timed out")]
    Timeout { request: String },

    /// The process (or its owning side) is gone
    #[error("Process has ended")]
    Ended,

    /// The `(service, function)` pair is not a syscall
    #[error("Attempt to access non-existent System Call {service}.{function}")]
    UnknownSyscall {
        process: String,
        service: String,
        function: String,
    },

    /// Neither an explicit identity nor a parent to inherit from
    #[error("No identity to start '{exec}' with")]
    MissingIdentity { exec: String },

    /// Executable content does not name a registered program
    #[error("'{key}' is not a registered program")]
    UnknownProgram { exec: String, key: String },

    /// No live process with this id
    #[error("No such process {0}")]
    UnknownProcess(Pid),

    /// Every process id has been handed out
    #[error("No process ids left")]
    PidsExhausted,

    /// Caller may not act on the target
    #[error("Not permitted to {action} process {target}")]
    Unauthorized { action: &'static str, target: Pid },

    /// Reply data did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Working directory or environment change rejected
    #[error("Invalid environment change: {0}")]
    InvalidEnv(String),
}

impl ProcessError {
    pub fn unauthorized(action: &'static str, target: Pid) -> Self {
        Self::Unauthorized { action, target }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ProcessError::Unauthorized { .. } => PERMISSIONS_ERROR,
            _ => PROCESS_ERROR,
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            ProcessError::Timeout { request } => Some(request.clone()),
            ProcessError::UnknownSyscall { process, .. } => Some(process.clone()),
            ProcessError::MissingIdentity { exec } | ProcessError::UnknownProgram { exec, .. } => {
                Some(exec.clone())
            }
            ProcessError::UnknownProcess(pid) => Some(pid.to_string()),
            ProcessError::Unauthorized { target, .. } => Some(target.to_string()),
            ProcessError::Ended
            | ProcessError::PidsExhausted
            | ProcessError::MalformedResponse(_)
            | ProcessError::InvalidEnv(_) => None,
        }
    }
}

impl From<ProcessError> for ErrorPayload {
    fn from(err: ProcessError) -> Self {
        let payload = ErrorPayload::new(err.category(), err.to_string());
        match err.context() {
            Some(context) => payload.with_context(context),
            None => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_syscall_names_process_and_pair() {
        let payload: ErrorPayload = ProcessError::UnknownSyscall {
            process: "/bin/sh[3]".into(),
            service: "FS".into(),
            function: "rename".into(),
        }
        .into();
        assert_eq!(payload.category(), "Process Error");
        assert!(payload.detail().contains("FS.rename"));
        assert_eq!(payload.context(), ["/bin/sh[3]".to_string()]);
    }

    #[test]
    fn test_unauthorized_is_permission_error() {
        let payload: ErrorPayload = ProcessError::unauthorized("kill", 4).into();
        assert!(payload.is_permission_denied());
    }
}
