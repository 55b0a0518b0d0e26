//! The identity record.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::paths::home_dir;

/// Name of the privileged user.
pub const ROOT_USER: &str = "root";

/// Environment variable holding the executable search path.
pub const PATH_VAR: &str = "path";

/// Separator between entries of [`PATH_VAR`].
pub const PATH_SEPARATOR: char = ';';

/// Environment variable mirroring the working directory.
pub const PWD_VAR: &str = "PWD";

/// Search path given to every new identity.
const DEFAULT_SEARCH_PATH: &str = "/bin";

/// Credential and context under which filesystem and process operations run.
///
/// Fields are private so the group-membership and `PWD` invariants cannot be
/// broken from outside; `Clone` is a deep copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityRecord")]
pub struct Identity {
    user: String,
    groups: BTreeSet<String>,
    working_dir: String,
    env: BTreeMap<String, String>,
    privileged: bool,
}

/// Unchecked wire form, validated through [`Identity::try_from`].
#[derive(Deserialize)]
struct IdentityRecord {
    user: String,
    #[serde(default)]
    groups: BTreeSet<String>,
    working_dir: String,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    privileged: bool,
}

impl TryFrom<IdentityRecord> for Identity {
    type Error = IdentityError;

    fn try_from(record: IdentityRecord) -> Result<Self, Self::Error> {
        let mut identity = Identity::new(&record.user, record.groups, &record.working_dir)?;
        for (name, value) in record.env {
            identity.set_env(&name, &value)?;
        }
        identity.privileged = record.privileged;
        Ok(identity)
    }
}

impl Identity {
    /// Create an identity for `user` with extra `groups`, starting in
    /// `working_dir`.
    ///
    /// The user becomes a member of its own group. `root` starts privileged.
    pub fn new<I, S>(user: &str, groups: I, working_dir: &str) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let user = user.trim().to_lowercase();
        if !valid_name(&user) {
            return Err(IdentityError::InvalidUser(user));
        }
        if !working_dir.starts_with('/') {
            return Err(IdentityError::RelativeWorkingDir(working_dir.to_string()));
        }

        let mut set: BTreeSet<String> = groups
            .into_iter()
            .map(|g| g.as_ref().trim().to_lowercase())
            .filter(|g| valid_name(g))
            .collect();
        set.insert(user.clone());

        let mut env = BTreeMap::new();
        env.insert(PATH_VAR.to_string(), DEFAULT_SEARCH_PATH.to_string());
        env.insert(PWD_VAR.to_string(), working_dir.to_string());

        Ok(Self {
            privileged: user == ROOT_USER,
            user,
            groups: set,
            working_dir: working_dir.to_string(),
            env,
        })
    }

    /// The privileged identity, rooted at `/`.
    pub fn root() -> Self {
        Self {
            user: ROOT_USER.to_string(),
            groups: BTreeSet::from([ROOT_USER.to_string()]),
            working_dir: String::from("/"),
            env: BTreeMap::from([
                (PATH_VAR.to_string(), DEFAULT_SEARCH_PATH.to_string()),
                (PWD_VAR.to_string(), String::from("/")),
            ]),
            privileged: true,
        }
    }

    /// An unprivileged identity for `user`, starting in its home directory.
    pub fn user(user: &str) -> Result<Self, IdentityError> {
        let home = home_dir(&user.trim().to_lowercase());
        Self::new(user, std::iter::empty::<&str>(), &home)
    }

    pub fn name(&self) -> &str {
        &self.user
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// Check group membership.
    pub fn is_member(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub fn home_dir(&self) -> String {
        home_dir(&self.user)
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Change the working directory. The caller is responsible for having
    /// normalized and validated `dir`.
    pub fn set_working_dir(&mut self, dir: &str) -> Result<(), IdentityError> {
        if !dir.starts_with('/') {
            return Err(IdentityError::RelativeWorkingDir(dir.to_string()));
        }
        self.working_dir = dir.to_string();
        self.env.insert(PWD_VAR.to_string(), dir.to_string());
        Ok(())
    }

    /// Set an environment variable. Setting `PWD` moves the working directory.
    pub fn set_env(&mut self, name: &str, value: &str) -> Result<(), IdentityError> {
        if name.is_empty() {
            return Err(IdentityError::EmptyVariable);
        }
        if name == PWD_VAR {
            return self.set_working_dir(value);
        }
        self.env.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Directories searched for executables, in order.
    pub fn search_path(&self) -> Vec<String> {
        self.env_var(PATH_VAR)
            .unwrap_or_default()
            .split(PATH_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    }

    /// Append `dir` to the search path unless it is already present.
    pub fn add_to_path(&mut self, dir: &str) {
        let mut entries = self.search_path();
        if entries.iter().any(|e| e == dir) {
            return;
        }
        entries.push(dir.to_string());
        self.env
            .insert(PATH_VAR.to_string(), entries.join(&PATH_SEPARATOR.to_string()));
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', ':', PATH_SEPARATOR]) && !name.contains(char::is_whitespace)
}
