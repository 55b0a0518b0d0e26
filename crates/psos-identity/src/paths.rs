//! Home directory helpers.

/// Directory that holds every user's home.
pub const HOME_ROOT: &str = "/home";

/// Returns the home directory of `user`.
pub fn home_dir(user: &str) -> String {
    format!("{}/{}", HOME_ROOT, user)
}
