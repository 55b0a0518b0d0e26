//! Terminal configuration: an optional TOML file, overridden by CLI flags.

use std::path::{Path, PathBuf};

use anyhow::Context;
use psos_supervisor::SupervisorConfig;
use serde::Deserialize;

/// Contents of the config file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TermConfig {
    pub supervisor: SupervisorConfig,
    /// User the shell runs as
    pub login: String,
    /// Executable started as the shell
    pub shell: String,
    /// JSON file backing the filesystem; in-memory when unset
    pub store: Option<PathBuf>,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            login: String::from("guest"),
            shell: String::from("sh"),
            store: None,
        }
    }
}

impl TermConfig {
    /// Read `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
