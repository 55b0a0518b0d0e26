//! PsOS Identity Layer
//!
//! Every filesystem call and every process carries an [`Identity`]: the user,
//! the groups that user belongs to, the working directory relative paths are
//! resolved against, an environment map, and the privilege flag.
//!
//! # Invariants
//!
//! - The user is always a member of its own group set
//! - Names (user and groups) are stored lower-case
//! - `PWD` in the environment always mirrors `working_dir`
//! - Identities handed to a new process are deep clones; processes never
//!   share a mutable identity
//!
//! # Layout
//!
//! ```text
//!   Identity ──► home_dir()      /home/<user>
//!            ──► search_path()   env["path"] split on ';'
//!            ──► set_env()       PWD mirrors working_dir
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::IdentityError;
pub use paths::{home_dir, HOME_ROOT};
pub use types::{Identity, PATH_VAR, PATH_SEPARATOR, PWD_VAR, ROOT_USER};
