//! Typed receivers for event hooks.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use psos_ipc::HookKey;

/// The handler end of a hook registration.
///
/// Yields `None` once the registration is replaced by a newer one or the
/// process ends.
pub struct Subscription<T> {
    key: HookKey,
    rx: mpsc::UnboundedReceiver<Value>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    pub(crate) fn new(key: HookKey, rx: mpsc::UnboundedReceiver<Value>) -> Self {
        Self {
            key,
            rx,
            _marker: PhantomData,
        }
    }

    /// Next event. Payloads that do not decode as `T` are logged and skipped.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let value = self.rx.recv().await?;
            match serde_json::from_value(value) {
                Ok(event) => return Some(event),
                Err(e) => warn!("[os] dropping malformed {} event: {}", self.key, e),
            }
        }
    }
}
