//! Supervisor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a [`Supervisor`](crate::Supervisor).
///
/// Every field has a default, so an empty TOML table is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// How long a program waits for a syscall reply, in milliseconds.
    /// `None` waits forever.
    pub request_timeout_ms: Option<u64>,

    /// `path` given to identities created through
    /// [`Supervisor::login`](crate::Supervisor::login)
    pub default_search_path: String,

    /// Also log console output through `tracing`
    pub console_echo: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: Some(30_000),
            default_search_path: String::from("/bin"),
            console_echo: false,
        }
    }
}

impl SupervisorConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_is_default() {
        let config: SupervisorConfig = toml::from_str("").unwrap();
        assert_eq!(config, SupervisorConfig::default());
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_table() {
        let config: SupervisorConfig =
            toml::from_str("request_timeout_ms = 250\nconsole_echo = true").unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(250)));
        assert!(config.console_echo);
        assert_eq!(config.default_search_path, "/bin");
    }
}
