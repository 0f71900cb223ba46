//! Tandem Console
//!
//! Interactive front end for the sample game session.
//!
//! # Usage
//!
//! ```bash
//! # Interactive
//! tandem-console
//!
//! # Replay a command script
//! tandem-console --script demo.txt
//!
//! # Verbose logging
//! tandem-console --log tandem_core=debug,tandem_console=debug
//! ```
//!
//! # Environment Variables
//!
//! - `TANDEM_CONFIG`: Configuration file path
//! - `TANDEM_WORKER_NAME`, `TANDEM_WORKER_STACK_KB`, `TANDEM_SLOW_REQUEST_MS`,
//!   `TANDEM_LOG`: see `tandem_core::config`
//! - `RUST_LOG`: overrides every other log filter

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tandem_console::{App, Output, Session};
use tandem_core::{
    load_config, load_config_from_path, logging, ConfigOverrides, EventLoop, Receiver,
    WorkerThread,
};

/// Tandem Console - drive a game session from the command line
#[derive(Parser, Debug)]
#[command(name = "tandem-console")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "TANDEM_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter directives (e.g. `tandem_core=debug`)
    #[arg(short = 'l', long, value_name = "FILTER")]
    log: Option<String>,

    /// Name of the session worker thread
    #[arg(long, value_name = "NAME")]
    worker_name: Option<String>,

    /// Read commands from a file instead of stdin
    #[arg(short = 's', long, value_name = "FILE")]
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match args.config {
        Some(path) => load_config_from_path(Some(path)),
        None => load_config(),
    }
    .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(name) = args.worker_name {
        overrides = overrides.with_worker_name(name);
    }
    if let Some(filter) = args.log {
        overrides = overrides.with_log_filter(filter);
    }
    overrides
        .apply(&mut config)
        .context("Invalid command line override")?;

    logging::init(&config.log_filter)?;
    info!(
        source = %config.source(),
        file = ?config.config_file_path,
        "Configuration loaded"
    );

    let input: Box<dyn BufRead + Send> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open script: {path:?}"))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let worker = WorkerThread::spawn(&config.worker)?;
    let session = Receiver::with_label(worker.dispatcher(), Session::demo(), "session")
        .with_slow_request_threshold(config.worker.slow_request_threshold);

    let mut event_loop = EventLoop::new();
    let mut app = App::new(session.sender(), event_loop.dispatcher(), Output::Stdout);

    if args.script.is_none() {
        println!("tandem console, type 'help' for commands");
    }
    let reader = app
        .run(&mut event_loop, input)
        .context("Failed to start input reader")?;

    drop(app);
    drop(session);
    worker.stop();
    let stats = worker.stats();
    info!(
        executed = stats.executed,
        discarded = stats.discarded,
        panicked = stats.panicked,
        "Session worker stopped"
    );

    // An interactive reader blocked on stdin is left behind on quit.
    if args.script.is_some() {
        let _ = reader.join();
    }
    Ok(())
}
