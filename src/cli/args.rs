//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "docsim")]
#[command(version)]
#[command(about = "Find similar documents by cosine similarity over term frequencies")]
#[command(styles = clap_cargo_style())]
pub struct Cli {
    /// Path to a settings file (defaults to .docsim/settings.toml)
    #[arg(short, long, global = true, env = "DOCSIM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up .docsim directory with default settings
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,

        /// Corpus file (overrides config)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Print the documents most similar to a document
    Similar {
        /// Id of the query document
        id: String,

        /// Number of results (defaults to similarity.default_limit)
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// Corpus file (overrides config)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print postings for every term starting with a prefix
    Tokens {
        /// Single-word prefix, case-insensitive
        prefix: String,

        /// Corpus file (overrides config)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
