//! PsOS Supervisor
//!
//! Ties the pieces together: a [`Vfs`](psos_vfs::Vfs) for storage, a
//! [`ProgramRegistry`] naming what executables do, and the [`Supervisor`]
//! that starts processes, answers their syscalls and routes their streams.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use psos_process::program_fn;
//! use psos_supervisor::{ProgramRegistry, Supervisor, SupervisorConfig, TracingConsole};
//! use psos_vfs::{bootstrap_filesystem, Vfs};
//!
//! let vfs = Arc::new(Vfs::default());
//! bootstrap_filesystem(&vfs, &["hello"]).await?;
//!
//! let programs = ProgramRegistry::new().with("hello", || {
//!     program_fn(|os| async move { os.std().out("hello").await })
//! });
//! let supervisor = Supervisor::new(vfs, programs, Arc::new(TracingConsole), SupervisorConfig::default());
//!
//! let identity = supervisor.login("guest")?;
//! let info = supervisor.start_process("hello", Vec::new(), Some(identity), None).await?;
//! supervisor.wait_for_exit(info.id).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod programs;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use console::{ChannelConsole, Console, ConsoleLine, TracingConsole};
pub use error::SpawnError;
pub use programs::ProgramRegistry;
pub use supervisor::{Spawned, Supervisor};
