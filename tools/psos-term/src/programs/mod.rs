//! Programs bundled with the terminal.
//!
//! Each is installed as `/bin/<name>` at boot; the file content is the key
//! looked up here.

mod shell;
mod utils;

use psos_supervisor::ProgramRegistry;

/// Every bundled program under its executable name.
pub fn registry() -> ProgramRegistry {
    ProgramRegistry::new()
        .with("sh", shell::sh)
        .with("echo", utils::echo)
        .with("cat", utils::cat)
        .with("ls", utils::ls)
        .with("mkdir", utils::mkdir)
        .with("touch", utils::touch)
        .with("rm", utils::rm)
        .with("rmdir", utils::rmdir)
        .with("write", utils::write)
        .with("chmod", utils::chmod)
        .with("chown", utils::chown)
        .with("pwd", utils::pwd)
        .with("ps", utils::ps)
        .with("kill", utils::kill)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use psos_identity::Identity;
    use psos_supervisor::{ChannelConsole, ConsoleLine, Supervisor, SupervisorConfig};
    use psos_vfs::{bootstrap_filesystem, Vfs};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::registry;

    struct Session {
        supervisor: Arc<Supervisor>,
        output: UnboundedReceiver<ConsoleLine>,
    }

    impl Session {
        async fn login(user: &str) -> Self {
            let vfs = Arc::new(Vfs::default());
            bootstrap_filesystem(&vfs, &registry().names()).await.unwrap();
            let (console, output) = ChannelConsole::new();
            let supervisor = Supervisor::new(
                vfs,
                registry(),
                Arc::new(console),
                SupervisorConfig::default(),
            );
            let identity = supervisor.login(user).unwrap();
            supervisor
                .start_process("sh", Vec::new(), Some(identity), None)
                .await
                .unwrap();
            Self { supervisor, output }
        }

        async fn run(&mut self, line: &str) -> String {
            assert!(self.supervisor.std_in("term", line));
            let line = tokio::time::timeout(Duration::from_secs(5), self.output.recv())
                .await
                .expect("no output")
                .expect("console closed");
            line.text()
        }
    }

    #[tokio::test]
    async fn test_shell_runs_programs() {
        let mut session = Session::login("guest").await;

        assert_eq!(session.run("echo hello world").await, "hello world");
        assert_eq!(session.run("pwd").await, "/home/guest");
        assert_eq!(session.run("write notes.txt hi there").await, "/home/guest/notes.txt");
        assert_eq!(session.run("cat notes.txt").await, "hi there");
        assert_eq!(
            session.run("ls").await,
            "drwxr-xr-x guest:guest 0 bin\n-rw-r--r-- guest:guest 8 notes.txt"
        );
    }

    #[tokio::test]
    async fn test_cd_moves_shell_and_children() {
        let mut session = Session::login("guest").await;

        assert_eq!(session.run("cd ..").await, "/home");
        assert_eq!(session.run("pwd").await, "/home");
        assert!(session.run("cd nowhere").await.starts_with("FS Error"));
    }

    #[tokio::test]
    async fn test_guest_cannot_write_bin() {
        let mut session = Session::login("guest").await;
        let out = session.run("write /bin/evil x").await;
        assert!(out.starts_with("Permissions Error"), "{}", out);

        let vfs = session.supervisor.vfs();
        assert!(!vfs.file_exists("/bin/evil", &Identity::root()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let mut session = Session::login("guest").await;
        assert_eq!(session.run("frobnicate").await, "sh: frobnicate: command not found");
    }
}
