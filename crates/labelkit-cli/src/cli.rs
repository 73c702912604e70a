use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// labelkit: annotation-tool dashboard and dataset split engine
///
/// Provisions a sandboxed runtime for the annotation tool and reorganizes
/// paired image/label datasets into train/val splits with a manifest.
#[derive(Parser, Debug)]
#[command(name = "labelkit", version, about, long_about = None)]
pub struct Cli {
    /// Increase output verbosity (show debug info)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// App directory holding labelkit.yaml and the runtime environment
    /// (overrides LABELKIT_HOME; defaults to the executable's directory)
    #[arg(long, global = true)]
    pub app_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Verbosity level resolved from --verbose / --quiet flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// --quiet: only errors and essential output
    Quiet,
    /// default: normal output
    Normal,
    /// --verbose: extra debug info
    Verbose,
}

impl Cli {
    /// Resolve the verbosity level from CLI flags
    pub fn verbosity(&self) -> Verbosity {
        match (self.quiet, self.verbose) {
            (true, _) => Verbosity::Quiet,
            (_, true) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the runtime environment and launch the annotation tool
    Launch(LaunchArgs),
    /// Split a paired image/label dataset into train/val with a manifest
    Split(SplitArgs),
    /// Write a default labelkit.yaml into the app directory
    Init(InitArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Listening port passed to the tool (overrides tool.port from config)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Source dataset root containing images/ and labels/ somewhere beneath it
    pub source: PathBuf,

    /// Directory the <source>_done clone is created under
    /// (defaults to the source's parent)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Train fraction in (0, 1) (overrides split.ratio from config)
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Shuffle seed for reproducible splits
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing labelkit.yaml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
