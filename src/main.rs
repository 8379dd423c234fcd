// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use ariadeck::colors::*;
use ariadeck::config::{self, AppConfig};
use ariadeck::error::{exit_code, exit_codes, explain};
use ariadeck::metrics::{format_rate, TaskSummary};
use ariadeck::rpc::{Aria2Client, RpcError, RpcResult, TaskOptions, TaskRecord};
use ariadeck::tasks::TaskAggregator;
use ariadeck::utils::mask_secret;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const COL_GID: usize = 16;
const COL_STATUS: usize = 9;
const COL_BAR: usize = 20;
const COL_SPEED: usize = 12;
const COL_SIZE: usize = 22;
const COL_NAME: usize = 40;

#[derive(Parser)]
#[command(name = "ariadeck")]
#[command(version = VERSION)]
#[command(about = "Terminal client for the aria2 download engine")]
#[command(after_help = "Quick start:\n\
    Start the engine:    aria2c --enable-rpc\n\
    Add a download:      ariadeck add https://example.org/file.iso\n\
    Watch progress:      ariadeck watch\n\
    Configure:           ariadeck config show")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.ariadeck/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Engine host for this run
    #[arg(long, global = true)]
    host: Option<String>,

    /// Engine RPC port for this run
    #[arg(long, global = true)]
    port: Option<u16>,

    /// RPC secret for this run
    #[arg(long, global = true)]
    secret: Option<String>,

    /// Quiet mode: errors only
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Verbose mode: log every engine call
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the engine version and enabled features
    Version,

    /// List active, waiting and recently stopped tasks
    ///
    /// Examples:
    ///   ariadeck list
    ///   ariadeck list --json
    #[command(alias = "ls")]
    List {
        /// Print raw task records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the number of tasks in the list view
    Count,

    /// Add a download from one or more URIs of the same file
    ///
    /// Examples:
    ///   ariadeck add https://example.org/file.iso
    ///   ariadeck add http://a/f.iso http://b/f.iso --split 8
    ///   ariadeck add magnet:?xt=... -o seed-time=0
    Add {
        /// URIs pointing at the same resource
        #[arg(required = true)]
        uris: Vec<String>,
        /// Download directory
        #[arg(short, long)]
        dir: Option<String>,
        /// Connections per download
        #[arg(short, long)]
        split: Option<u32>,
        /// Connections per server
        #[arg(long = "max-conn")]
        max_conn: Option<u32>,
        /// Any engine option as name=value, sent verbatim (repeat a name for
        /// list options such as header)
        #[arg(short = 'o', long = "option", value_parser = TaskOptions::parse_assignment)]
        options: Vec<(String, String)>,
    },

    /// Pause a task
    Pause { gid: String },

    /// Resume a paused task
    Resume { gid: String },

    /// Remove a task
    #[command(alias = "rm")]
    Remove { gid: String },

    /// Pause every active and waiting task
    PauseAll,

    /// Resume every paused task
    ResumeAll,

    /// Show global transfer statistics
    Stats,

    /// Refresh the task list until Ctrl+C
    Watch {
        /// Seconds between refreshes (defaults to display.refresh-interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Manage settings
    ///
    /// Examples:
    ///   ariadeck config show
    ///   ariadeck config set rpc.secret my-secret
    ///   ariadeck config set download.split 8
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current settings
    Show,
    /// Change one setting
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

/// A fault from the engine, tagged with where we were talking to.
#[derive(Debug)]
struct EngineFailure {
    endpoint: String,
    source: RpcError,
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for EngineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Settings that cannot produce a usable connection.
#[derive(Debug)]
struct InvalidSettings(String);

impl fmt::Display for InvalidSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid connection settings: {}", self.0)
    }
}

impl std::error::Error for InvalidSettings {}

struct Session {
    client: Aria2Client,
    endpoint: String,
    config: AppConfig,
}

impl Session {
    fn open(cli: &Cli, config: AppConfig) -> Result<Self> {
        let mut rpc = config.rpc.clone();
        if let Some(host) = &cli.host {
            rpc.host = host.clone();
        }
        if let Some(port) = cli.port {
            rpc.port = port;
        }
        if let Some(secret) = &cli.secret {
            rpc.secret = secret.clone();
        }

        let descriptor = rpc
            .descriptor()
            .map_err(|e| anyhow::Error::new(InvalidSettings(e.to_string())))?;
        let endpoint = descriptor.endpoint();
        let client = Aria2Client::new(descriptor).map_err(|source| EngineFailure {
            endpoint: endpoint.clone(),
            source,
        })?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    fn check<T>(&self, result: RpcResult<T>) -> Result<T> {
        result.map_err(|source| {
            anyhow::Error::new(EngineFailure {
                endpoint: self.endpoint.clone(),
                source,
            })
        })
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ariadeck={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => config::default_path(),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let code = match run(&cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    };
    std::process::exit(code);
}

fn report(err: &anyhow::Error) -> i32 {
    if let Some(failure) = err.downcast_ref::<EngineFailure>() {
        eprintln!("{RED}{}{RESET}", explain(&failure.source, &failure.endpoint));
        return exit_code(&failure.source);
    }
    if let Some(invalid) = err.downcast_ref::<InvalidSettings>() {
        eprintln!("{RED}{}{RESET} {}", symbols::ERROR, invalid);
        eprintln!("Fix it with: ariadeck config set <key> <value>");
        return exit_codes::CONFIG;
    }
    eprintln!("{RED}{}{RESET} {:#}", symbols::ERROR, err);
    exit_codes::FAILURE
}

fn run(cli: &Cli) -> Result<()> {
    let path = config_path(cli)?;

    if let Commands::Config { command } = &cli.command {
        return handle_config(command.as_ref(), &path);
    }

    let config = AppConfig::load(&path)
        .map_err(|e| anyhow::Error::new(InvalidSettings(format!("{:#}", e))))?;
    let session = Session::open(cli, config)?;

    match &cli.command {
        Commands::Version => show_version(&session),
        Commands::List { json } => list_tasks(&session, *json),
        Commands::Count => {
            println!("{}", TaskAggregator::new(session.client.clone()).count());
            Ok(())
        }
        Commands::Add {
            uris,
            dir,
            split,
            max_conn,
            options,
        } => add_download(&session, uris, dir.as_deref(), *split, *max_conn, options),
        Commands::Pause { gid } => {
            session.check(session.client.pause(gid))?;
            println!("{GREEN}{}{RESET} Paused {}", symbols::SUCCESS, gid);
            Ok(())
        }
        Commands::Resume { gid } => {
            session.check(session.client.unpause(gid))?;
            println!("{GREEN}{}{RESET} Resumed {}", symbols::SUCCESS, gid);
            Ok(())
        }
        Commands::Remove { gid } => {
            session.check(session.client.remove(gid))?;
            println!("{GREEN}{}{RESET} Removed {}", symbols::SUCCESS, gid);
            Ok(())
        }
        Commands::PauseAll => {
            session.check(session.client.pause_all())?;
            println!("{GREEN}{}{RESET} Paused all tasks", symbols::SUCCESS);
            Ok(())
        }
        Commands::ResumeAll => {
            session.check(session.client.unpause_all())?;
            println!("{GREEN}{}{RESET} Resumed all tasks", symbols::SUCCESS);
            Ok(())
        }
        Commands::Stats => show_stats(&session),
        Commands::Watch { interval } => {
            let interval = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| session.config.display.refresh_interval());
            watch(&session, interval)
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn show_version(session: &Session) -> Result<()> {
    let version = session.check(session.client.get_version())?;
    println!(
        "{} {} at {}",
        "aria2".bright_cyan().bold(),
        version.version.bold(),
        session.endpoint
    );
    if !version.enabled_features.is_empty() {
        println!("{DIM}Features: {}{RESET}", version.enabled_features.join(", "));
    }
    Ok(())
}

fn list_tasks(session: &Session, json: bool) -> Result<()> {
    let aggregate = TaskAggregator::new(session.client.clone()).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregate.tasks)?);
    } else {
        print_table(&aggregate.tasks);
    }

    for (list, err) in &aggregate.skipped {
        eprintln!(
            "{YELLOW}{}{RESET} {} tasks unavailable: {}",
            symbols::WARNING,
            list,
            err
        );
    }
    Ok(())
}

fn add_download(
    session: &Session,
    uris: &[String],
    dir: Option<&str>,
    split: Option<u32>,
    max_conn: Option<u32>,
    extra: &[(String, String)],
) -> Result<()> {
    let mut options = TaskOptions::from_assignments(extra.iter().cloned());
    if let Some(dir) = dir {
        options.insert("dir", dir);
    }
    if let Some(split) = split {
        options.insert("split", split.to_string());
    }
    if let Some(max_conn) = max_conn {
        options.insert("max-connection-per-server", max_conn.to_string());
    }
    session.config.download.apply_defaults(&mut options);

    let gid = session.check(session.client.add_uri(uris, &options))?;
    println!("{GREEN}{}{RESET} Added {}", symbols::SUCCESS, gid.bold());
    Ok(())
}

fn show_stats(session: &Session) -> Result<()> {
    let stat = session.check(session.client.get_global_stat())?;

    println!();
    println!("{BRIGHT_CYAN}{BOLD}=== aria2 Statistics ==={RESET}");
    println!();
    println!("  Download:  {}", format_rate(stat.download_speed()).green());
    println!("  Upload:    {}", format_rate(stat.upload_speed()).cyan());
    println!("  Active:    {}", stat.num_active());
    println!("  Waiting:   {}", stat.num_waiting());
    println!(
        "  Stopped:   {} {DIM}({} since start){RESET}",
        stat.num_stopped(),
        stat.num_stopped_total()
    );
    println!();
    Ok(())
}

fn watch(session: &Session, interval: Duration) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;

    let aggregator = TaskAggregator::new(session.client.clone());
    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    runtime.block_on(async {
        while !stop.load(Ordering::Relaxed) {
            let tasks = aggregator.fetch_all_async().await;

            // Clear screen, cursor home
            print!("\x1b[2J\x1b[H");
            println!(
                "{BRIGHT_CYAN}{BOLD}ariadeck{RESET} {DIM}{} | every {}s | Ctrl+C to quit{RESET}",
                session.endpoint,
                interval.as_secs()
            );
            println!();
            print_table(&tasks);

            let mut waited = Duration::ZERO;
            let tick = Duration::from_millis(200);
            while waited < interval && !stop.load(Ordering::Relaxed) {
                tokio::time::sleep(tick).await;
                waited += tick;
            }
        }
    });

    println!();
    Ok(())
}

fn print_table(tasks: &[TaskRecord]) {
    if tasks.is_empty() {
        println!("{DIM}No tasks.{RESET}");
        return;
    }

    println!(
        "{DIM}{} {} {} {} {} NAME{RESET}",
        pad_display("GID", COL_GID),
        pad_display("STATUS", COL_STATUS),
        pad_display("PROGRESS", COL_BAR + 5),
        pad_display("SPEED", COL_SPEED),
        pad_display("SIZE", COL_SIZE)
    );

    for task in tasks {
        let row = TaskSummary::from_record(task);
        let status_text = pad_display(row.status.as_str(), COL_STATUS);
        println!(
            "{} {}{}{RESET} {} {:>3}% {} {} {}",
            pad_display(&row.gid, COL_GID),
            status_color(row.status),
            status_text,
            progress_bar(row.progress, COL_BAR),
            row.percent(),
            pad_display(speed_cell(&row), COL_SPEED),
            pad_display(&row.size, COL_SIZE),
            truncate_display(short_name(&row.name), COL_NAME)
        );
        if let Some(error) = &row.error {
            println!("{:width$} {RED}{}{RESET}", "", error, width = COL_GID);
        }
    }
}

/// Stopped tasks no longer transfer, so their speed column stays blank.
fn speed_cell(row: &TaskSummary) -> &str {
    if row.status.is_stopped() {
        "-"
    } else {
        &row.speed
    }
}

/// File name part of a task path, or the whole name for placeholders.
fn short_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
}

/// Pad plain text to a display width.
fn pad_display(s: &str, target_width: usize) -> String {
    let current_width = UnicodeWidthStr::width(s);
    if current_width >= target_width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(target_width - current_width))
    }
}

/// Cut plain text to at most `max_width` columns, marking the cut with `~`.
fn truncate_display(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('~');
    out
}

fn handle_config(command: Option<&ConfigCommands>, path: &Path) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let config = AppConfig::load(path)?;
            println!();
            println!("{BRIGHT_CYAN}{BOLD}=== ariadeck Configuration ==={RESET}");
            println!();
            println!("  rpc.host:          {}", config.rpc.host);
            println!("  rpc.port:          {}", config.rpc.port);
            println!("  rpc.path:          {}", config.rpc.path);
            println!("  rpc.protocol:      {}", config.rpc.protocol);
            println!("  rpc.secret:        {}", mask_secret(&config.rpc.secret));
            println!("  rpc.timeout:       {}s", config.rpc.timeout_secs);
            println!("  rpc.retries:       {}", config.rpc.retries);
            println!(
                "  download.dir:      {}",
                display_or_unset(&config.download.default_directory)
            );
            println!(
                "  download.split:    {}",
                display_option(config.download.split)
            );
            println!(
                "  download.max-connection-per-server: {}",
                display_option(config.download.max_connection_per_server)
            );
            println!(
                "  display.refresh-interval: {}s",
                config.display.refresh_interval_secs
            );
            println!();
            println!("Config file: {}", path.display());
            println!();
        }
        Some(ConfigCommands::Set { key, value }) => {
            let mut config = AppConfig::load(path)?;
            config.set(key, value)?;
            config.save(path)?;
            let shown = if key == "rpc.secret" {
                mask_secret(value)
            } else {
                value.clone()
            };
            println!("{GREEN}{}{RESET} {} set to: {}", symbols::SUCCESS, key, shown);
        }
        Some(ConfigCommands::Path) => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn display_or_unset(value: &str) -> String {
    if value.is_empty() {
        format!("{DIM}(not set){RESET}")
    } else {
        value.to_string()
    }
}

fn display_option(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| format!("{DIM}(engine default){RESET}"))
}
