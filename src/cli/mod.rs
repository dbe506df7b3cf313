//! CLI command definitions for taskflow
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};

/// TaskFlow task manager with a conversational assistant
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Port for the HTTP API (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API (default if no subcommand given)
    Serve,

    /// Serve the task operations as MCP tools over stdio for one user
    Mcp {
        /// Username whose tasks the tools operate on
        #[arg(short, long)]
        user: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::parse_from(["taskflow"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn mcp_requires_user() {
        let cli = Cli::parse_from(["taskflow", "--port", "9000", "mcp", "--user", "alice"]);
        assert_eq!(cli.port, Some(9000));
        assert!(matches!(cli.command, Some(Command::Mcp { ref user }) if user == "alice"));
        assert!(Cli::try_parse_from(["taskflow", "mcp"]).is_err());
    }
}
