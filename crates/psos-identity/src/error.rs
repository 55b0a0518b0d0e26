//! Error types for the Identity layer.

use serde::{Deserialize, Serialize};

/// Errors from identity construction and mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum IdentityError {
    /// User name is empty or contains a separator character
    #[error("invalid user name '{0}'")]
    InvalidUser(String),

    /// Working directory must be absolute
    #[error("working directory '{0}' is not absolute")]
    RelativeWorkingDir(String),

    /// Environment variable name is empty
    #[error("environment variable name is empty")]
    EmptyVariable,
}
