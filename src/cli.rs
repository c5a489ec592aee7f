//! CLI module - Command-line interface definitions and handlers

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::backends::exec::{Invocation, ProcessExecutor};
use crate::backends::transport::UnzipTransport;
use crate::cache::advisory::Advisory;
use crate::cache::policy::{RetentionPolicy, DEFAULT_RETENTION_DAYS};
use crate::cache::store::CacheStore;
use crate::config::{self, Descriptor};
use crate::core::paths::{default_home, normalize_path, project_key};
use crate::core::render::{OutputFormat, RenderConfig, Renderer, Row};
use crate::flows::launch::Launcher;

/// Binary name; any other name means the launcher runs as a tool shim
pub const BIN_NAME: &str = "pinrun";

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "PINRUN_LOG";

/// pinrun - run the tool version a project pins, fetching and caching it on demand.
#[derive(Parser, Debug)]
#[command(name = "pinrun")]
#[command(
    author,
    version,
    about,
    long_about = r#"pinrun reads the nearest .pinrun file, makes sure the archive it declares
is extracted in the local cache, and runs the declared executable with your
arguments, standard streams and exit status passed straight through.

.pinrun format:
    URL = https://example.com/tool-1.2.0.zip
    URL[aarch64] = https://example.com/tool-1.2.0-arm64.zip
    CHECKSUM = 1.2.0
    EXECUTABLE = bin/tool
    ENV_TOOL_MODE = strict

CHECKSUM is an invalidation token: change it and the archive is fetched again.
It is required for remote URLs and optional for local archives.

Installed under another name (e.g. a `tool` symlink to pinrun), every argument
is forwarded as with `pinrun exec`.

Examples:
    pinrun exec -- --version
    pinrun which
    pinrun cache list --format text
    pinrun cache sweep
"#
)]
pub struct Cli {
    /// Launcher home holding config.json and the cache directory.
    #[arg(
        long,
        global = true,
        env = "PINRUN_HOME",
        value_name = "DIR",
        long_help = "Launcher home holding the cache index (config.json) and the extracted\n\
archives (cache/). Defaults to the per-user application data directory."
    )]
    pub home: Option<PathBuf>,

    /// Directory to start searching for the project config from.
    #[arg(
        long,
        global = true,
        env = "PINRUN_PROJECT_DIR",
        value_name = "DIR",
        long_help = "Directory to start the .pinrun search from (defaults to the current\n\
directory). The search walks up through every parent directory."
    )]
    pub project_dir: Option<PathBuf>,

    /// Days an unused cached archive is kept.
    #[arg(
        long,
        global = true,
        env = "PINRUN_RETENTION_DAYS",
        default_value_t = DEFAULT_RETENTION_DAYS,
        value_name = "DAYS",
        long_help = "Cached archives not used by any project for this many days are removed\n\
by the sweep that runs after every launch (and by `pinrun cache sweep`)."
    )]
    pub retention_days: u32,

    /// Output format for listing commands (jsonl/json/text).
    #[arg(long, global = true, default_value = "jsonl", value_name = "FORMAT")]
    pub format: String,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log cache decisions and fetch steps.
    #[arg(
        short,
        long,
        global = true,
        long_help = "Log cache decisions, downloads and cleanup to stderr. The PINRUN_LOG\n\
environment variable accepts a full filter (e.g. PINRUN_LOG=pinrun=trace)."
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the project's pinned tool, forwarding all arguments.
    #[command(
        long_about = "Resolve the project's .pinrun, reuse or refresh the cached archive and\n\
replace this process with the declared executable.\n\n\
pinrun's own global options (-v, -q, --home, --format, ...) are still\n\
recognized until the first tool argument. Put `--` before the tool's\n\
arguments to forward those too: `pinrun exec -- -v` passes -v to the tool.\n\n\
Examples:\n\
  pinrun exec -- --help\n\
  pinrun exec build --release\n"
    )]
    Exec {
        /// Arguments passed to the tool verbatim.
        #[arg(
            value_name = "ARGS",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<OsString>,
    },

    /// Prepare the cache and print the resolved executable path.
    Which,

    /// Print the resolved project config.
    Config,

    /// Inspect and maintain the archive cache.
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Check the launcher's prerequisites.
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List cache entries.
    List,

    /// Remove archives not used within the retention window.
    Sweep,

    /// Drop one project's entry and its archive.
    #[command(
        long_about = "Drop the cache entry of a project and remove its extracted archive.\n\n\
PROJECT is the directory holding the project's .pinrun; if omitted, the\n\
project found from --project-dir (or the current directory) is used."
    )]
    Forget {
        /// Project directory.
        #[arg(value_name = "PROJECT")]
        project: Option<PathBuf>,
    },

    /// Remove the cache index and every cached archive.
    Clear,
}

/// One cache entry as printed by `cache list`
#[derive(Debug, Serialize)]
pub struct EntryRow {
    pub project: String,
    pub directory: String,
    pub last_used: String,
    pub checksum: Option<String>,
    pub present: bool,
}

impl Row for EntryRow {
    fn to_text(&self) -> String {
        format!(
            "{}  {}  {}  {}{}",
            self.project,
            self.directory,
            self.last_used,
            self.checksum.as_deref().unwrap_or("-"),
            if self.present { "" } else { "  (missing)" }
        )
    }
}

/// A path removed by a maintenance command
#[derive(Debug, Serialize)]
pub struct RemovedRow {
    pub removed: String,
}

impl Row for RemovedRow {
    fn to_text(&self) -> String {
        format!("removed {}", self.removed)
    }
}

/// Whether the process was started under a tool's name rather than `pinrun`
pub fn is_shim(argv0: &OsString) -> bool {
    Path::new(argv0)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem != BIN_NAME)
        .unwrap_or(false)
}

/// Arguments equivalent to `pinrun exec -- <args>` for shim mode
pub fn shim_args(forwarded: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args = vec![
        OsString::from(BIN_NAME),
        OsString::from("exec"),
        OsString::from("--"),
    ];
    args.extend(forwarded);
    args
}

/// Install the stderr log subscriber
pub fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("pinrun=debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

impl Cli {
    fn home(&self) -> PathBuf {
        self.home.clone().unwrap_or_else(default_home)
    }

    fn start_dir(&self) -> Result<PathBuf> {
        match &self.project_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Failed to read current directory"),
        }
    }

    fn render_config(&self) -> Result<RenderConfig> {
        let format: OutputFormat = self.format.parse().map_err(anyhow::Error::msg)?;
        Ok(RenderConfig::with_pretty(format, self.pretty))
    }

    fn descriptor(&self) -> Result<Descriptor> {
        let start = self.start_dir()?;
        let path = config::discover(&start, &config::config_file_name())?;
        let descriptor = config::load(&path)?;
        Ok(descriptor)
    }

    fn open_store(&self) -> Result<CacheStore> {
        let home = self.home();
        CacheStore::load(&home)
            .with_context(|| format!("Failed to open launcher home {}", home.display()))
    }
}

/// Run the parsed command; returns the process exit code
pub fn run(cli: Cli) -> Result<i32> {
    if cli.no_color {
        colored::control::set_override(false);
    }
    let retention = RetentionPolicy::days(cli.retention_days);

    match &cli.command {
        Commands::Exec { args } => {
            let descriptor = cli.descriptor()?;
            let transport = UnzipTransport;
            let mut launcher = Launcher::new(cli.open_store()?, &transport, retention);
            let code = launcher
                .run(&descriptor, args.clone(), &ProcessExecutor)
                .with_context(|| format!("Failed to launch {}", descriptor.executable))?;
            Ok(code)
        }
        Commands::Which => {
            let descriptor = cli.descriptor()?;
            let transport = UnzipTransport;
            let mut launcher = Launcher::new(cli.open_store()?, &transport, retention);
            let prepared = launcher.prepare(&descriptor)?;
            let invocation =
                Invocation::new(&prepared.slot, &descriptor.executable, Vec::new(), &[]);
            println!("{}", invocation.binary.display());
            Ok(0)
        }
        Commands::Config => {
            let descriptor = cli.descriptor()?;
            let renderer = Renderer::with_config(cli.render_config()?);
            renderer.render_to(std::slice::from_ref(&descriptor), std::io::stdout())?;
            Ok(0)
        }
        Commands::Cache { action } => run_cache(&cli, action, &retention),
        Commands::Doctor => {
            crate::backends::doctor::run_doctor(&cli.home(), cli.render_config()?)?;
            Ok(0)
        }
    }
}

fn run_cache(cli: &Cli, action: &CacheCommands, retention: &RetentionPolicy) -> Result<i32> {
    let renderer = Renderer::with_config(cli.render_config()?);

    match action {
        CacheCommands::List => {
            let store = cli.open_store()?;
            let rows: Vec<EntryRow> = store
                .index()
                .entries
                .iter()
                .map(|(project, entry)| EntryRow {
                    project: project.clone(),
                    directory: entry.directory.clone(),
                    last_used: entry.last_used_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    checksum: entry.version.as_str().map(str::to_string),
                    present: store.directory_if_present(&entry.directory).is_some(),
                })
                .collect();
            renderer.render_to(&rows, std::io::stdout())?;
        }
        CacheCommands::Sweep => {
            let mut store = cli.open_store()?;
            let advisory = store.sweep_stale(retention, None);
            let rows = removed_rows(&advisory.removed);
            warn_if_incomplete(&advisory);
            advisory.log("sweep");
            renderer.render_to(&rows, std::io::stdout())?;
        }
        CacheCommands::Forget { project } => {
            let key = match project {
                Some(dir) => project_key(dir).unwrap_or_else(|_| normalize_path(dir)),
                None => cli.descriptor()?.project_key,
            };
            let mut store = cli.open_store()?;
            match store.forget(&key)? {
                Some(advisory) => {
                    let rows = removed_rows(&advisory.removed);
                    warn_if_incomplete(&advisory);
                    advisory.log("forget");
                    renderer.render_to(&rows, std::io::stdout())?;
                }
                None => eprintln!("No cache entry for {}", key),
            }
        }
        CacheCommands::Clear => {
            let advisory = CacheStore::clear_home(&cli.home());
            let rows = removed_rows(&advisory.removed);
            warn_if_incomplete(&advisory);
            advisory.log("clear");
            renderer.render_to(&rows, std::io::stdout())?;
        }
    }

    Ok(0)
}

fn warn_if_incomplete(advisory: &Advisory) {
    if !advisory.is_clean() {
        eprintln!(
            "{} path(s) could not be removed; run with --verbose for details",
            advisory.failures.len()
        );
    }
}

fn removed_rows(paths: &[PathBuf]) -> Vec<RemovedRow> {
    paths
        .iter()
        .map(|path| RemovedRow {
            removed: path.display().to_string(),
        })
        .collect()
}
