//! A minimal shell.
//!
//! Reads command lines from `Std:in`, runs each as a child process and
//! passes child output on. `cd` and `exit` are builtins since they act on
//! the shell itself.

use psos_ipc::{ErrorPayload, Source};
use psos_process::{program_fn, Os, Program};
use tracing::debug;

pub fn sh() -> Box<dyn Program> {
    program_fn(|os| async move {
        let mut input = os.std_in();
        while let Some(msg) = input.next().await {
            match msg.from {
                Source::Pid(child) => {
                    debug!("[sh] output from {}", child);
                    os.std().out(msg.data).await?;
                }
                Source::Name(_) => {
                    if !run_line(&os, &msg.text()).await? {
                        break;
                    }
                }
            }
        }
        Ok(())
    })
}

/// Run one command line. `Ok(false)` means the shell should exit.
async fn run_line(os: &Os, line: &str) -> Result<bool, ErrorPayload> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(true);
    };
    let args: Vec<String> = words.map(String::from).collect();

    match command {
        "exit" => return Ok(false),
        "cd" => {
            let target = args.first().cloned().unwrap_or_else(|| String::from("~"));
            match os.process().change_working_dir(&target).await {
                Ok(dir) => os.std().out(dir).await?,
                Err(err) => os.std().out(err.to_string()).await?,
            }
        }
        _ => {
            if let Err(err) = os.process().start(command, args).await {
                let message = if err.is_not_found() {
                    format!("sh: {}: command not found", command)
                } else {
                    err.to_string()
                };
                os.std().out(message).await?;
            }
        }
    }
    Ok(true)
}
