//! # Quarry CLI
//!
//! Command-line interface for searching a Quarry library.
//!
//! ## Commands
//!
//! - `quarry search <query>` - Search items across books
//! - `quarry check <query>` - Show how a query is understood
//! - `quarry books` - List the books in the library
//!
//! ## Example Usage
//!
//! ```bash
//! # Titles containing "rust", newest first
//! quarry search 'title:rust -sort:create'
//!
//! # Items created during 2020 in one book, as JSON
//! quarry search 'create:2020-2021' --book Main --output json
//!
//! # Explain a query without running it
//! quarry check 're: title:^intro -type:separator'
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Quarry - Search your web archive
#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Library directory (overrides the configured one)
    #[arg(short = 'L', long, global = true, env = "QUARRY_LIBRARY")]
    library: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search items matching a query
    #[command(alias = "s")]
    Search {
        /// Query string, e.g. `title:rust -type:separator sort:create`
        query: String,

        /// Only search these books, by name (can be used multiple times)
        #[arg(short, long)]
        book: Vec<String>,

        /// Only search under these item ids (can be used multiple times)
        #[arg(short, long)]
        root: Vec<String>,

        /// Maximum number of results to show per book
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Parse a query and show its rules, sort keys and scopes
    Check {
        /// Query string
        query: String,
    },

    /// List the books in the library
    Books,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => quarry_core::Config::load_from(path)?,
        None => quarry_core::Config::load()?,
    };
    if let Some(library) = cli.library {
        config.general.library_path = Some(library);
    }

    // Setup logging; results go to stdout, logs to stderr
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Search {
            query,
            book,
            root,
            limit,
            output,
        } => commands::search::run(config, &query, &book, &root, limit, output),
        Commands::Check { query } => commands::check::run(config, &query),
        Commands::Books => commands::books::run(config),
    }
}
