//! Path utilities for the VFS layer.
//!
//! Every path the store sees is absolute and normalized: a single leading
//! slash, no `.` or `..` segments, no trailing slash except for `/` itself.

use psos_identity::{home_dir, Identity};

/// Normalize an absolute or relative path string.
///
/// Empty and `.` segments are dropped, `..` pops the previous segment and
/// is a no-op at the root. The result always starts with `/`.
pub fn normalize_path(path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                components.pop();
            }
            c => components.push(c),
        }
    }

    if components.is_empty() {
        String::from("/")
    } else {
        let mut result = String::new();
        for component in components {
            result.push('/');
            result.push_str(component);
        }
        result
    }
}

/// Resolve user input against an identity.
///
/// A leading `~` expands to the identity's home followed by `/`; anything
/// not absolute is taken relative to the working directory.
pub fn resolve_path(path: &str, identity: &Identity) -> String {
    let path = path.trim();
    let expanded = match path.strip_prefix('~') {
        Some(rest) => format!("{}/{}", home_dir(identity.name()), rest),
        None => path.to_string(),
    };

    if expanded.starts_with('/') {
        normalize_path(&expanded)
    } else {
        normalize_path(&format!("{}/{}", identity.working_dir(), expanded))
    }
}

/// Get the parent path of a given path.
pub fn parent_path(path: &str) -> String {
    if path == "/" {
        return String::from("/");
    }

    match path.rfind('/') {
        Some(0) => String::from("/"),
        Some(pos) => String::from(&path[..pos]),
        None => String::from("/"),
    }
}

/// Get the filename (last component) of a path.
pub fn filename(path: &str) -> &str {
    if path == "/" {
        return "";
    }

    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Extension after the last `.` of the filename, empty if there is none.
pub fn extension(path: &str) -> &str {
    let name = filename(path);
    match name.rfind('.') {
        Some(pos) => &name[pos + 1..],
        None => "",
    }
}

/// Check if a path is under a given base path.
pub fn is_under(path: &str, base: &str) -> bool {
    if base == "/" {
        return true;
    }

    path.starts_with(base) && (path.len() == base.len() || path.as_bytes()[base.len()] == b'/')
}

/// Directories that must be traversed to reach `path`, from `/` down to its
/// parent. Empty for `/` itself.
pub fn ancestors(path: &str) -> Vec<String> {
    if path == "/" {
        return Vec::new();
    }

    let mut dirs = vec![String::from("/")];
    let parent = parent_path(path);
    let mut current = String::new();
    for component in parent.split('/').filter(|c| !c.is_empty()) {
        current.push('/');
        current.push_str(component);
        dirs.push(current.clone());
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest() -> Identity {
        Identity::user("guest").unwrap()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/home/user"), "/home/user");
        assert_eq!(normalize_path("/home/./user/"), "/home/user");
        assert_eq!(normalize_path("//home//user"), "/home/user");
        assert_eq!(normalize_path("/home/user/../other"), "/home/other");
        assert_eq!(normalize_path("/a/b/c/../../d"), "/a/d");
        assert_eq!(normalize_path("/.."), "/");
        assert_eq!(normalize_path("/../../a"), "/a");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for p in ["/", "a/b/..", "/x/./y//z/", "../..", "/a/../../b/c/.", "~/x"] {
            let once = normalize_path(p);
            assert_eq!(normalize_path(&once), once, "input {p:?}");
        }
    }

    #[test]
    fn test_resolve_path() {
        let id = guest();
        assert_eq!(resolve_path("~", &id), "/home/guest");
        assert_eq!(resolve_path("~/project", &id), "/home/guest/project");
        assert_eq!(resolve_path("notes.txt", &id), "/home/guest/notes.txt");
        assert_eq!(resolve_path("../root", &id), "/home/root");
        assert_eq!(resolve_path("  /bin/ls ", &id), "/bin/ls");
        assert_eq!(resolve_path("", &id), "/home/guest");
        assert_eq!(resolve_path("../../../..", &id), "/");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/"), "/");
        assert_eq!(parent_path("/home"), "/");
        assert_eq!(parent_path("/home/user"), "/home");
        assert_eq!(parent_path("/home/user/docs"), "/home/user");
    }

    #[test]
    fn test_filename_and_extension() {
        assert_eq!(filename("/"), "");
        assert_eq!(filename("/home/user/file.txt"), "file.txt");
        assert_eq!(extension("/home/user/file.txt"), "txt");
        assert_eq!(extension("/home/user/archive.tar.gz"), "gz");
        assert_eq!(extension("/bin/ls"), "");
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("/home/user", "/home"));
        assert!(is_under("/anything", "/"));
        assert!(!is_under("/home", "/home/user"));
        assert!(!is_under("/homeuser", "/home"));
    }

    #[test]
    fn test_ancestors() {
        assert!(ancestors("/").is_empty());
        assert_eq!(ancestors("/bin"), vec!["/"]);
        assert_eq!(
            ancestors("/home/guest/note"),
            vec!["/", "/home", "/home/guest"]
        );
    }
}
