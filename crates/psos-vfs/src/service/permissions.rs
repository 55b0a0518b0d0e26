//! Permission checking utilities for the VFS layer.

use psos_identity::Identity;

use crate::core::{Action, Entry, VfsError};

/// Check whether `identity` may perform `action` on `entry`.
///
/// - Privileged identities may always read and write, but may only execute
///   when some class already carries the execute bit
/// - Otherwise owner, group membership and other bits are consulted in turn,
///   and any one granting the action is enough
pub fn has_permission(entry: &Entry, action: Action, identity: &Identity) -> bool {
    let bit = action.bit();

    if identity.is_privileged() {
        return action != Action::Execute || entry.perms.any_execute();
    }

    if identity.name() == entry.owner.user && entry.perms.owner() & bit != 0 {
        return true;
    }

    if identity.is_member(&entry.owner.group) && entry.perms.group() & bit != 0 {
        return true;
    }

    entry.perms.other() & bit != 0
}

/// [`has_permission`] as a `Result` naming `path`.
pub fn check_permission(
    path: &str,
    entry: &Entry,
    action: Action,
    identity: &Identity,
) -> Result<(), VfsError> {
    if has_permission(entry, action, identity) {
        Ok(())
    } else {
        Err(VfsError::denied(action, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Owner, PermBits};

    fn entry(user: &str, group: &str, perms: &str) -> Entry {
        let mut e = Entry::file("", Owner::new(user, group));
        e.perms = PermBits::parse(perms).unwrap();
        e
    }

    fn user(name: &str, groups: &[&str]) -> Identity {
        Identity::new(name, groups.iter().copied(), "/").unwrap()
    }

    #[test]
    fn test_owner_bits() {
        let e = entry("alice", "alice", "600");
        assert!(has_permission(&e, Action::Read, &user("alice", &[])));
        assert!(has_permission(&e, Action::Write, &user("alice", &[])));
        assert!(!has_permission(&e, Action::Execute, &user("alice", &[])));
        assert!(!has_permission(&e, Action::Read, &user("bob", &[])));
    }

    #[test]
    fn test_group_bits() {
        let e = entry("alice", "dev", "640");
        assert!(has_permission(&e, Action::Read, &user("bob", &["dev"])));
        assert!(!has_permission(&e, Action::Write, &user("bob", &["dev"])));
        assert!(!has_permission(&e, Action::Read, &user("carol", &[])));
    }

    #[test]
    fn test_any_class_grants() {
        // owner bits deny but other grants: owner still gets access
        let e = entry("alice", "alice", "004");
        assert!(has_permission(&e, Action::Read, &user("alice", &[])));
    }

    #[test]
    fn test_privileged() {
        let root = Identity::root();
        let secret = entry("alice", "alice", "000");
        assert!(has_permission(&secret, Action::Read, &root));
        assert!(has_permission(&secret, Action::Write, &root));
        assert!(!has_permission(&secret, Action::Execute, &root));

        let script = entry("alice", "alice", "001");
        assert!(has_permission(&script, Action::Execute, &root));
    }

    #[test]
    fn test_no_bits_denies_everything() {
        let e = entry("alice", "dev", "000");
        let who = user("alice", &["dev"]);
        for action in [Action::Read, Action::Write, Action::Execute] {
            assert_eq!(
                check_permission("/f", &e, action, &who),
                Err(VfsError::denied(action, "/f"))
            );
        }
    }
}
