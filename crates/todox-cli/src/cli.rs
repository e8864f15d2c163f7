//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "todox",
    version,
    about = "Export, verify and sync .todolistx todo containers",
    long_about = "Export todo lists to tamper-evident .todolistx containers, import them back,\n\
                  and keep offline edits in a local queue until they can be synced."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: platform config folder).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export a todo document (JSON) to a .todolistx container.
    Export(ExportArgs),

    /// Verify and import one or more .todolistx containers.
    Import(ImportArgs),

    /// Show the header of a container and whether it verifies.
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Export several documents into one zip bundle.
    Bundle(BundleArgs),

    /// Import every container in a zip bundle.
    Unbundle {
        #[arg(value_name = "ZIP")]
        bundle: PathBuf,

        /// Queue imported documents for the next sync.
        #[arg(long)]
        enqueue: bool,
    },

    /// Manage the offline queue.
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Show or initialize the settings file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
pub struct ExportArgs {
    /// Todo document as JSON.
    #[arg(value_name = "DOC.json")]
    pub document: PathBuf,

    /// Directory for the container (default: current directory).
    #[arg(long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Write a plain zlib payload without the keyed transform.
    #[arg(long = "no-transform")]
    pub no_transform: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Queue imported documents for the next sync.
    #[arg(long)]
    pub enqueue: bool,
}

#[derive(Args)]
pub struct BundleArgs {
    /// Todo documents as JSON.
    #[arg(value_name = "DOC.json", required = true)]
    pub documents: Vec<PathBuf>,

    /// Directory for the bundle (default: current directory).
    #[arg(long = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Queue documents (JSON) for the next sync.
    Save {
        #[arg(value_name = "DOC.json", required = true)]
        documents: Vec<PathBuf>,
    },

    /// List queued documents.
    List,

    /// Drop one queued document.
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Drop every queued document.
    Clear,

    /// Push queued documents and remove the ones that were delivered.
    Sync(SyncArgs),
}

#[derive(Args)]
#[group(multiple = false)]
pub struct SyncArgs {
    /// POST queued documents to this URL (default: `sync.endpoint` setting).
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Write queued documents as JSON files into this directory.
    #[arg(long, value_name = "DIR")]
    pub outbox: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings as TOML.
    Show,

    /// Print the settings file location.
    Path,

    /// Write default settings to the settings file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
