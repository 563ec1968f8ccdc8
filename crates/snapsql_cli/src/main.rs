//! SnapSQL CLI
//!
//! Command-line tools for SnapSQL stores.
//!
//! # Commands
//!
//! - `inspect` - Summarize the stored snapshot
//! - `exec` - Run SQL against the database and persist it
//! - `query` - Run a query and print the rows
//! - `export` - Copy the raw snapshot to a file
//! - `import` - Replace the stored snapshot with one from a file

mod commands;

use clap::{Parser, Subcommand};
use commands::Target;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SnapSQL command-line database tools.
#[derive(Parser)]
#[command(name = "snapsql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory of the file backend
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Store name inside the backend
    #[arg(global = true, short, long, default_value = "my-sqlite-db")]
    store: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the stored snapshot
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Execute SQL statements and persist the result
    Exec {
        /// SQL to execute (several statements separated by `;`)
        sql: String,
    },

    /// Run a query and print its rows
    Query {
        /// SELECT statement
        sql: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write the raw stored snapshot to a file
    Export {
        /// Destination file
        file: PathBuf,
    },

    /// Replace the stored snapshot with the contents of a file
    Import {
        /// Snapshot file produced by `export`
        file: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("SnapSQL CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("SQLite v{}", rusqlite::version());
        println!(
            "Snapshot format v{}",
            snapsql_codec::FORMAT_VERSION
        );
        return Ok(());
    }

    let root = cli.path.ok_or("Store path required (--path)")?;
    let target = Target::new(root, cli.store);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Inspect { format } => commands::inspect::run(&target, &format).await,
            Commands::Exec { sql } => commands::exec::run(&target, &sql).await,
            Commands::Query { sql, format } => commands::query::run(&target, &sql, &format).await,
            Commands::Export { file } => commands::transfer::export(&target, &file).await,
            Commands::Import { file } => commands::transfer::import(&target, &file).await,
            Commands::Version => Ok(()),
        }
    })
}
