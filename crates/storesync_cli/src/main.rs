//! storesync CLI
//!
//! Command-line tools for inspecting cross-store migration state.
//!
//! # Commands
//!
//! - `tombstone encode` - Build the tombstone name of a migrated object
//! - `tombstone decode` - Show the destination store named by a tombstone
//! - `ledger dump` - Print the rows of an immigrant version ledger
//! - `ledger verify` - Check every frame of an immigrant version ledger

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// storesync migration tools.
#[derive(Parser)]
#[command(name = "storesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode or decode migration tombstone names
    Tombstone {
        #[command(subcommand)]
        action: TombstoneAction,
    },

    /// Inspect an immigrant version ledger file
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum TombstoneAction {
    /// Print the tombstone name for an object moving to a store
    Encode {
        /// Object id (32 hex characters)
        oid: String,
        /// Destination store id (32 hex characters)
        store: String,
    },

    /// Print the destination store of a tombstone name
    Decode {
        /// Tombstone name
        name: String,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Print ledger rows
    Dump {
        /// Path to the ledger file
        #[arg(short, long)]
        path: PathBuf,

        /// Maximum number of rows to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify ledger frames and checksums
    Verify {
        /// Path to the ledger file
        #[arg(short, long)]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Tombstone { action } => match action {
            TombstoneAction::Encode { oid, store } => {
                println!("{}", commands::tombstone::encode(&oid, &store)?);
            }
            TombstoneAction::Decode { name } => {
                println!("{}", commands::tombstone::describe(&name));
            }
        },
        Commands::Ledger { action } => match action {
            LedgerAction::Dump {
                path,
                limit,
                format,
            } => {
                commands::ledger::dump(&path, limit, &format)?;
            }
            LedgerAction::Verify { path } => {
                commands::ledger::verify(&path)?;
            }
        },
        Commands::Version => {
            println!("storesync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("storesync core v{}", storesync_core::VERSION);
        }
    }

    Ok(())
}
