//! PsOS terminal
//!
//! Boots a filesystem, installs the bundled programs, logs a user in and
//! starts the shell. Lines read from stdin go to the foreground process;
//! console output goes to stdout, logs to stderr.

mod config;
mod programs;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use psos_supervisor::{ChannelConsole, Supervisor};
use psos_vfs::{bootstrap_filesystem, FileStore, Vfs};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::TermConfig;

#[derive(Debug, Parser)]
#[command(name = "psos-term", version, about = "Multi-user process simulation in a terminal")]
struct Cli {
    /// TOML config file
    #[arg(short, long, env = "PSOS_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file backing the filesystem
    #[arg(long)]
    store: Option<PathBuf>,

    /// User to log in as
    #[arg(short, long)]
    user: Option<String>,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut config = TermConfig::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store = Some(store);
    }
    if let Some(user) = cli.user {
        config.login = user;
    }

    let vfs = match &config.store {
        Some(path) => Vfs::new(
            FileStore::open(path)
                .await
                .with_context(|| format!("opening store {}", path.display()))?,
        ),
        None => Vfs::default(),
    };
    let programs = programs::registry();
    bootstrap_filesystem(&vfs, &programs.names()).await?;

    let (console, mut output) = ChannelConsole::new();
    let supervisor = Supervisor::new(
        Arc::new(vfs),
        programs,
        Arc::new(console),
        config.supervisor.clone(),
    );

    let identity = supervisor.login(&config.login)?;
    let shell = supervisor
        .start_process(&config.shell, Vec::new(), Some(identity), None)
        .await
        .with_context(|| format!("starting shell '{}'", config.shell))?;
    info!("[term] {} logged in, shell is process {}", config.login, shell.id);

    let printer = tokio::spawn(async move {
        while let Some(line) = output.recv().await {
            println!("{}", line.text());
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    supervisor.std_in(&config.login, line);
                }
                None => break,
            },
            _ = supervisor.wait_for_exit(shell.id) => break,
        }
    }

    supervisor.end_process(shell.id);
    printer.abort();
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
