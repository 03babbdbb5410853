//! CLI argument definitions for sharpgraph.
//!
//! Commands:
//! - graph: full node/link payload as JSON
//! - stats: scan + graph statistics
//! - regen: print regenerated source for one type
//! - watch: live per-file updates as JSON lines

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sharpgraph")]
#[command(about = "C# code model and class-diagram graph engine")]
pub struct Cli {
    /// Workspace root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Link-toggle configuration file (TOML). Defaults to
    /// <root>/sharpgraph.toml when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the workspace and print the full node/link payload as JSON
    Graph,

    /// Scan the workspace and print model and graph statistics
    Stats,

    /// Print regenerated source text for one type
    Regen {
        /// The type key, e.g. App.Core.Order
        key: String,
    },

    /// Watch the workspace and stream update messages as JSON lines
    Watch,
}
