//! Command-line interface for strategy_town.

use clap::{Parser, Subcommand};

/// Strategy Town - multiplayer game session server
#[derive(Parser, Debug)]
#[command(name = "strategy_town")]
#[command(about = "Multiplayer game session server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP and WebSocket game server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database path; sessions are kept in memory when omitted
        #[arg(long)]
        db: Option<String>,
    },

    /// List the game kinds this server can host
    Kinds,
}
