//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// userd - user record service
#[derive(Parser)]
#[command(name = "userd", about = "User record service with an in-memory registry and SQLite mirror")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the number of persisted users and exit
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_with_port_override() {
        let cli = Cli::parse_from(["ud", "serve", "--port", "9000"]);
        match cli.command {
            Some(Command::Serve { port }) => assert_eq!(port, Some(9000)),
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_no_subcommand_defaults() {
        let cli = Cli::parse_from(["ud", "--verbose"]);
        assert!(cli.command.is_none());
        assert!(cli.verbose);
    }
}
