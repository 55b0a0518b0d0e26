//! The interface every executable implements.

use std::future::Future;

use async_trait::async_trait;
use psos_ipc::ErrorPayload;

use crate::os::Os;

/// Body of an executable.
///
/// `run` is the whole life of the process: when it returns `Ok` the process
/// ends, when it returns `Err` the error is reported through the crash path
/// and the process ends.
#[async_trait]
pub trait Program: Send + 'static {
    async fn run(self: Box<Self>, os: Os) -> Result<(), ErrorPayload>;
}

/// Program backed by an async closure.
pub struct FnProgram<F>(F);

#[async_trait]
impl<F, Fut> Program for FnProgram<F>
where
    F: FnOnce(Os) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ErrorPayload>> + Send + 'static,
{
    async fn run(self: Box<Self>, os: Os) -> Result<(), ErrorPayload> {
        (self.0)(os).await
    }
}

/// Box an async closure as a [`Program`].
pub fn program_fn<F, Fut>(f: F) -> Box<dyn Program>
where
    F: FnOnce(Os) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ErrorPayload>> + Send + 'static,
{
    Box::new(FnProgram(f))
}
