//! The program registry.
//!
//! An executable file in the VFS holds a registry key, not code. Starting a
//! process reads the file, trims the content and asks the registry for a
//! fresh [`Program`] under that key.

use std::collections::BTreeMap;
use std::sync::Arc;

use psos_process::Program;

type Factory = Arc<dyn Fn() -> Box<dyn Program> + Send + Sync>;

/// Named program factories.
#[derive(Clone, Default)]
pub struct ProgramRegistry {
    factories: BTreeMap<String, Factory>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `key`, replacing any previous one.
    pub fn register<F>(&mut self, key: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Program> + Send + Sync + 'static,
    {
        self.factories.insert(key.to_string(), Arc::new(factory));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, key: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Program> + Send + Sync + 'static,
    {
        self.register(key, factory);
        self
    }

    /// A fresh instance of the program registered under `key`.
    pub fn instantiate(&self, key: &str) -> Option<Box<dyn Program>> {
        self.factories.get(key).map(|factory| factory())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psos_process::program_fn;

    #[test]
    fn test_register_and_instantiate() {
        let registry = ProgramRegistry::new()
            .with("true", || program_fn(|_os| async { Ok(()) }))
            .with("false", || {
                program_fn(|_os| async { Err(psos_ipc::ErrorPayload::process("false")) })
            });

        assert!(registry.contains("true"));
        assert!(registry.instantiate("false").is_some());
        assert!(registry.instantiate("missing").is_none());
        assert_eq!(registry.names(), vec!["false", "true"]);
    }
}
