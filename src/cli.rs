//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Notes editor backend: open, reconcile and save documents from the terminal.
#[derive(Parser, Debug)]
#[command(name = "scribe", version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON) layered over the user config
    #[arg(short, long, global = true, env = "SCRIBE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a document, reconcile it with the cache, and print its content
    Open {
        id: String,
        /// Which copy wins if the cached and remote copies differ
        #[arg(long, value_enum)]
        keep: Option<Keep>,
    },
    /// Save new content for a document, as the editor would
    Push {
        id: String,
        /// JSON document content
        content: PathBuf,
        #[arg(long, value_enum)]
        keep: Option<Keep>,
    },
    /// Print word count, character count and reading time of a text file
    Stats { file: PathBuf },
    /// Ask the remote for a summary of a text file
    Summarise { file: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Keep {
    /// The copy cached on this device
    Local,
    /// The copy stored remotely
    Cloud,
}
