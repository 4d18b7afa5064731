use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use midnamctl::common::Globals;
use midnamctl::{cmd_details, cmd_info, cmd_merge, cmd_normalize, cmd_patch, cmd_validate};

#[derive(Parser, Debug)]
#[command(name = "midnamctl", version, about = "MIDNAM document tool")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long, global = true)]
    json: bool,
    /// DOCTYPE written when the document carries none
    #[arg(long, global = true)]
    default_doctype: Option<String>,
    /// Indent with N spaces instead of tabs
    #[arg(long, global = true)]
    indent_spaces: Option<usize>,
    /// Skip the timestamped backup before overwriting
    #[arg(long, global = true)]
    no_backup: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Merge a structure payload (JSON) into a document
    Merge {
        #[arg(long)]
        file: PathBuf,
        /// JSON payload, `-` for stdin
        #[arg(long)]
        payload: PathBuf,
    },
    /// Apply a single-patch edit request (JSON)
    Patch {
        /// JSON request, `-` for stdin
        #[arg(long)]
        request: PathBuf,
        /// Overrides `file_path` in the request
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Repair element order and placement in place
    Normalize {
        #[arg(long)]
        file: PathBuf,
        /// Report needed fixes without writing
        #[arg(long)]
        check: bool,
    },
    /// Device identity and bank summary
    Info {
        #[arg(long)]
        file: PathBuf,
    },
    /// Full device record
    Details {
        #[arg(long)]
        file: PathBuf,
        /// Print as a structure payload for `merge`
        #[arg(long)]
        as_update: bool,
    },
    /// Check syntax and required structure
    Validate {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let Cli {
        verbose,
        json,
        default_doctype,
        indent_spaces,
        no_backup,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let globals = Globals {
        json,
        default_doctype,
        indent_spaces,
        no_backup,
    };

    match cmd {
        Cmd::Merge { file, payload } => cmd_merge::run(file, payload, &globals)?,
        Cmd::Patch { request, file } => cmd_patch::run(request, file, &globals)?,
        Cmd::Normalize { file, check } => cmd_normalize::run(file, check, &globals)?,
        Cmd::Info { file } => cmd_info::run(file, &globals)?,
        Cmd::Details { file, as_update } => cmd_details::run(file, as_update, &globals)?,
        Cmd::Validate { file } => cmd_validate::run(file, &globals)?,
    };

    Ok(())
}
