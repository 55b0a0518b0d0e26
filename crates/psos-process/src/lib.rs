//! PsOS Process Runtime
//!
//! What a program sees of the system:
//!
//! - [`Program`]: the trait every executable implements
//! - [`Os`]: the syscall proxy handed to a running program, with typed
//!   service wrappers ([`Fs`], [`ProcessApi`], [`Std`])
//! - [`Subscription`]: the handler end of an event hook
//! - [`ProcessError`]: lifecycle and protocol errors
//!
//! # Example
//!
//! ```no_run
//! use psos_process::{program_fn, Program};
//!
//! fn cat() -> Box<dyn Program> {
//!     program_fn(|os| async move {
//!         for path in os.params().to_vec() {
//!             let text = os.fs().read(&path).await?;
//!             os.std().out(text).await?;
//!         }
//!         Ok(())
//!     })
//! }
//! ```

pub mod api;
pub mod error;
pub mod os;
pub mod program;
pub mod subscription;

pub use api::{Fs, ProcessApi, Std};
pub use error::ProcessError;
pub use os::Os;
pub use program::{program_fn, FnProgram, Program};
pub use subscription::Subscription;
