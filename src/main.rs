// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! fdt: File Directory Transfer
//!
//! Command-line front end for the rule store, the directory watcher, the
//! one-shot scanner and the action log.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use fdt::config::DEFAULT_CONFIG_FILE;
use fdt::pattern::RulePattern;
use fdt::watcher::wait_for_stable;
use fdt::{scan_all, ActionLog, Dispatcher, Operation, Rule, RuleStore, WatchCoordinator};

/// Upper bound on how long a growing file is waited for before dispatch
const MAX_SETTLE_WAIT: Duration = Duration::from_secs(10);

/// fdt CLI - rule-driven file placement
#[derive(Parser, Debug)]
#[command(name = "fdt")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Watch directories and copy or move matching files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the rule file (JSON format)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Path to the action log
    #[arg(long, default_value = "logs.txt", global = true)]
    log_file: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log what would happen without creating, copying or deleting anything
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch source directories and dispatch new files
    Watch {
        /// Scan existing files before watching
        #[arg(long)]
        scan: bool,

        /// Poll interval for waiting until a new file stops growing (0 disables)
        #[arg(long, default_value = "500")]
        settle_ms: u64,
    },

    /// Dispatch every file currently in the source directories
    Scan,

    /// Rule management
    Rules {
        #[command(subcommand)]
        action: RuleCommands,
    },

    /// Show the action log
    Logs {
        /// Only show the last N entries
        #[arg(short, long)]
        tail: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum RuleCommands {
    /// List configured rules
    List {
        /// Print rules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a rule and save the rule file
    Add {
        /// Directory to watch and scan
        #[arg(short, long)]
        source: String,

        /// Directory to place matching files into
        #[arg(short, long)]
        destination: String,

        /// Regular expression tested against the file name
        #[arg(short, long)]
        pattern: String,

        /// Sort files into subfolders named after the match
        #[arg(long)]
        subfolders: bool,

        /// Copy or move matching files
        #[arg(short, long, value_enum, default_value_t = OperationArg::Copy)]
        operation: OperationArg,
    },

    /// Remove the rule at INDEX and save the rule file
    Remove {
        /// Zero-based rule index, as shown by `rules list`
        index: usize,
    },

    /// Check patterns and source directories
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OperationArg {
    Copy,
    Move,
}

impl From<OperationArg> for Operation {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Copy => Operation::Copy,
            OperationArg::Move => Operation::Move,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let log = ActionLog::new(cli.log_file.clone());
    let mut store = RuleStore::load(cli.config.clone(), &log);
    let dispatcher = Dispatcher::new(log.clone()).with_dry_run(cli.dry_run);

    if cli.dry_run {
        warn!("DRY RUN MODE - files will not be copied or moved");
    }

    match cli.command {
        Some(Commands::Watch { scan, settle_ms }) => {
            run_watch(&store, dispatcher, scan, settle_ms).await
        }
        Some(Commands::Scan) => run_scan(&store, &dispatcher),
        Some(Commands::Rules { action }) => run_rules_command(&mut store, action),
        Some(Commands::Logs { tail }) => run_logs(&log, tail),
        None => run_watch(&store, dispatcher, false, 500).await,
    }
}

/// Run the watch mode until Ctrl+C or SIGTERM
async fn run_watch(
    store: &RuleStore,
    dispatcher: Dispatcher,
    scan_first: bool,
    settle_ms: u64,
) -> anyhow::Result<()> {
    // Rules added after this point take effect on the next start
    let rules = store.rules().to_vec();
    if rules.is_empty() {
        warn!("No rules configured in {:?}", store.path());
    }

    if scan_first {
        for diagnostic in scan_all(&dispatcher, &rules) {
            warn!("{}", diagnostic);
        }
    }

    let mut coordinator = WatchCoordinator::new(dispatcher);
    coordinator.watch_files(&rules);

    if !coordinator.is_watching() {
        warn!("No source directory is being watched");
    }

    // Setup graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = terminate => info!("Received SIGTERM, shutting down..."),
        }

        let _ = shutdown_tx.send(true);
    });

    info!("Monitoring active. Press Ctrl+C to stop.");

    let settle = Duration::from_millis(settle_ms);

    // Main event loop; files are dispatched one at a time, in arrival order
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let Some(event) = coordinator.next_event(Duration::from_millis(100)) else {
            continue;
        };

        if !settle.is_zero() {
            if let Some(path) = coordinator.resolve(&event) {
                match settle_file(&path, settle, &mut shutdown_rx).await {
                    Settled::Ready => {}
                    Settled::Vanished => {
                        debug!("File disappeared during stability check: {:?}", path);
                        continue;
                    }
                    Settled::Shutdown => break,
                }
            }
        }

        coordinator.handle_event(event);
    }

    coordinator.unwatch_all();
    info!("Monitoring stopped.");
    Ok(())
}

/// Result of waiting for a new file to stop growing
#[derive(Debug, PartialEq, Eq)]
enum Settled {
    Ready,
    Vanished,
    Shutdown,
}

/// Wait for `path` to settle, giving up as soon as shutdown is requested
async fn settle_file(
    path: &Path,
    interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Settled {
    tokio::select! {
        stable = wait_for_stable(path, interval, MAX_SETTLE_WAIT) => {
            if stable {
                Settled::Ready
            } else {
                Settled::Vanished
            }
        }
        _ = shutdown_rx.wait_for(|stop| *stop) => Settled::Shutdown,
    }
}

/// Run a one-shot scan and print its diagnostics
fn run_scan(store: &RuleStore, dispatcher: &Dispatcher) -> anyhow::Result<()> {
    let diagnostics = scan_all(dispatcher, store.rules());

    if diagnostics.is_empty() {
        println!("Scan complete. See {} for details.", dispatcher.log().path().display());
    } else {
        println!("Scan complete with {} problem(s):", diagnostics.len());
        for diagnostic in &diagnostics {
            println!("  {}", diagnostic);
        }
    }

    Ok(())
}

/// Run rule commands
fn run_rules_command(store: &mut RuleStore, action: RuleCommands) -> anyhow::Result<()> {
    match action {
        RuleCommands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(store.rules())?);
            } else if store.rules().is_empty() {
                println!("No rules configured in {}", store.path().display());
            } else {
                for (i, rule) in store.rules().iter().enumerate() {
                    println!("{:3}. {}", i, describe_rule(rule));
                }
            }
        }
        RuleCommands::Add {
            source,
            destination,
            pattern,
            subfolders,
            operation,
        } => {
            if let Err(e) = RulePattern::compile(&pattern) {
                eprintln!("Warning: {} - the rule will be skipped for every file", e);
            }

            let mut rule = Rule::new(source, destination, pattern).with_operation(operation.into());
            if subfolders {
                rule = rule.with_subfolders();
            }

            println!("Added: {}", describe_rule(&rule));
            store.add_rule(rule);
            save(store)?;
        }
        RuleCommands::Remove { index } => match store.remove_rule(index) {
            Some(rule) => {
                save(store)?;
                println!("Removed: {}", describe_rule(&rule));
            }
            None => println!("No rule at index {}", index),
        },
        RuleCommands::Validate => {
            let mut invalid = 0;
            for (i, rule) in store.rules().iter().enumerate() {
                if let Err(e) = RulePattern::compile(&rule.pattern) {
                    println!("{:3}. {}", i, e);
                    invalid += 1;
                }
                if !Path::new(&rule.source).is_dir() {
                    println!("{:3}. Source directory does not exist: {}", i, rule.source);
                }
            }

            if invalid > 0 {
                bail!("{} rule(s) have invalid patterns", invalid);
            }
            println!("{} rule(s) checked", store.rules().len());
        }
    }

    Ok(())
}

fn save(store: &RuleStore) -> anyhow::Result<()> {
    store
        .save()
        .with_context(|| format!("Failed to save rules to {}", store.path().display()))
}

fn describe_rule(rule: &Rule) -> String {
    format!(
        "[{}] {} -> {} (pattern='{}'{})",
        rule.operation,
        rule.source,
        rule.destination,
        rule.pattern,
        if rule.create_subfolders { ", subfolders" } else { "" }
    )
}

/// Print the action log
fn run_logs(log: &ActionLog, tail: Option<usize>) -> anyhow::Result<()> {
    match tail {
        Some(count) => {
            for line in log.tail(count)? {
                println!("{}", line);
            }
        }
        None => print!("{}", log.read_all()?),
    }

    Ok(())
}
