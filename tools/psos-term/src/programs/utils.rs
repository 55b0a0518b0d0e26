//! Small file and process utilities.
//!
//! Each runs once over its params and writes a single block of text. Errors
//! are printed rather than crashing the process.

use std::future::Future;

use psos_ipc::{ErrorPayload, Pid};
use psos_process::{program_fn, Os, Program};

fn tool<F, Fut>(body: F) -> Box<dyn Program>
where
    F: FnOnce(Os) -> Fut + Send + 'static,
    Fut: Future<Output = Result<String, ErrorPayload>> + Send + 'static,
{
    program_fn(|os| async move {
        let text = match body(os.clone()).await {
            Ok(text) => text,
            Err(err) => err.to_string(),
        };
        if text.is_empty() {
            return Ok(());
        }
        os.std().out(text).await
    })
}

fn usage(text: &str) -> ErrorPayload {
    ErrorPayload::fs(format!("usage: {}", text))
}

pub fn echo() -> Box<dyn Program> {
    tool(|os| async move { Ok(os.params().join(" ")) })
}

pub fn cat() -> Box<dyn Program> {
    tool(|os| async move {
        let mut out = Vec::new();
        for path in os.params() {
            out.push(os.fs().read(path).await?);
        }
        Ok(out.join("\n"))
    })
}

pub fn ls() -> Box<dyn Program> {
    tool(|os| async move {
        let dir = os.params().first().map(String::as_str).unwrap_or(".");
        let lines: Vec<String> = os
            .fs()
            .list(dir)
            .await?
            .into_iter()
            .map(|e| format!("{} {}:{} {} {}", e.perms, e.user, e.group, e.size, e.name))
            .collect();
        Ok(lines.join("\n"))
    })
}

pub fn mkdir() -> Box<dyn Program> {
    tool(|os| async move {
        for path in os.params() {
            os.fs().mkdir(path).await?;
        }
        Ok(String::new())
    })
}

pub fn touch() -> Box<dyn Program> {
    tool(|os| async move {
        for path in os.params() {
            os.fs().touch(path).await?;
        }
        Ok(String::new())
    })
}

pub fn rm() -> Box<dyn Program> {
    tool(|os| async move {
        for path in os.params() {
            os.fs().del(path).await?;
        }
        Ok(String::new())
    })
}

pub fn rmdir() -> Box<dyn Program> {
    tool(|os| async move {
        for path in os.params() {
            os.fs().del_dir(path).await?;
        }
        Ok(String::new())
    })
}

/// `write <path> <text...>`
pub fn write() -> Box<dyn Program> {
    tool(|os| async move {
        let Some((path, words)) = os.params().split_first() else {
            return Err(usage("write <path> <text...>"));
        };
        let written = os.fs().write(path, &words.join(" ")).await?;
        Ok(written.path)
    })
}

/// `chmod <perms> <path...>`
pub fn chmod() -> Box<dyn Program> {
    tool(|os| async move {
        let Some((perms, paths)) = os.params().split_first() else {
            return Err(usage("chmod <perms> <path...>"));
        };
        for path in paths {
            os.fs().chmod(path, perms).await?;
        }
        Ok(String::new())
    })
}

/// `chown <user[:group]> <path...>`
pub fn chown() -> Box<dyn Program> {
    tool(|os| async move {
        let Some((owner, paths)) = os.params().split_first() else {
            return Err(usage("chown <user[:group]> <path...>"));
        };
        let (user, group) = match owner.split_once(':') {
            Some((user, group)) => (user, Some(group)),
            None => (owner.as_str(), None),
        };
        for path in paths {
            os.fs().chown(path, Some(user), group).await?;
        }
        Ok(String::new())
    })
}

pub fn pwd() -> Box<dyn Program> {
    tool(|os| async move { Ok(os.identity().working_dir().to_string()) })
}

pub fn ps() -> Box<dyn Program> {
    tool(|os| async move {
        let lines: Vec<String> = os
            .process()
            .list()
            .await?
            .into_iter()
            .map(|p| {
                let parent = p.parent_id.map(|id| id.to_string()).unwrap_or_default();
                format!("{} {} {} {}", p.id, parent, p.identity.name(), p.exec)
            })
            .collect();
        Ok(lines.join("\n"))
    })
}

/// `kill <pid...>`
pub fn kill() -> Box<dyn Program> {
    tool(|os| async move {
        for arg in os.params() {
            let pid: Pid = arg
                .parse()
                .map_err(|_| usage("kill <pid...>"))?;
            os.process().kill(pid).await?;
        }
        Ok(String::new())
    })
}
